use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use acoustic_link::{DecoderEngine, MessageEncoder, TransmissionParameters};

fn params(num_channels: u32) -> TransmissionParameters {
    TransmissionParameters::new()
        .with_num_channels(num_channels)
        .build()
        .unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for &channels in &[2u32, 8, 32] {
        let encoder = MessageEncoder::new(params(channels));
        let payload = vec![b'x'; 12];
        group.bench_with_input(
            BenchmarkId::from_parameter(channels),
            &payload,
            |b, payload| b.iter(|| black_box(encoder.encode(black_box(payload)))),
        );
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for &channels in &[2u32, 8, 32] {
        let send = params(channels);
        let recv = TransmissionParameters::new()
            .with_num_channels(channels)
            .with_is_master(false)
            .build()
            .unwrap();
        let encoder = MessageEncoder::new(send);
        let audio = encoder.encode(&vec![b'x'; 12]);
        group.bench_with_input(BenchmarkId::from_parameter(channels), &audio, |b, audio| {
            b.iter(|| {
                let mut decoder = DecoderEngine::new(recv);
                black_box(decoder.push_and_poll(black_box(audio)));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
