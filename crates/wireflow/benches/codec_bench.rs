use bytes::BytesMut;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tokio_util::codec::{Decoder, Encoder};
use wireflow::codec::ChunkedDecoder;
use wireflow::protocol::PayloadItem;
use wireflow::ws::{FrameDecoder, FrameEncoder, WsMessage};

fn chunked_decode_benchmark(c: &mut Criterion) {
    // 64 chunks of 1 KiB each plus the terminal chunk
    let mut wire = Vec::new();
    for _ in 0..64 {
        wire.extend_from_slice(b"400\r\n");
        wire.extend_from_slice(&[b'x'; 1024]);
        wire.extend_from_slice(b"\r\n");
    }
    wire.extend_from_slice(b"0\r\n\r\n");

    c.bench_function("chunked_decode_64k", |b| {
        b.iter(|| {
            let mut decoder = ChunkedDecoder::new();
            let mut buffer = BytesMut::from(&wire[..]);
            loop {
                match decoder.decode(&mut buffer).unwrap() {
                    Some(PayloadItem::Eof(info)) => break black_box(info),
                    Some(item) => {
                        black_box(item);
                    }
                    None => unreachable!("wire is complete"),
                }
            }
        })
    });
}

fn frame_decode_benchmark(c: &mut Criterion) {
    let mut encoder = FrameEncoder::client();
    let mut encoded = BytesMut::new();
    encoder.encode(WsMessage::binary(vec![0x42u8; 4096]), &mut encoded).unwrap();
    let wire = encoded.freeze();

    c.bench_function("frame_decode_4k_masked", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::server();
            let mut buffer = BytesMut::from(&wire[..]);
            black_box(decoder.decode(&mut buffer).unwrap().unwrap())
        })
    });

    let mut encoder = FrameEncoder::server();
    c.bench_function("frame_encode_4k", |b| {
        let payload = vec![0x42u8; 4096];
        b.iter(|| {
            let mut buffer = BytesMut::with_capacity(4096 + 16);
            encoder.encode(WsMessage::binary(payload.clone()), &mut buffer).unwrap();
            black_box(buffer)
        })
    });
}

criterion_group!(benches, chunked_decode_benchmark, frame_decode_benchmark);
criterion_main!(benches);
