use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modbus_rs::modbus::checksum::{crc16, crc16_bitwise, lrc};

fn benchmark_checksums(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");
    for size in [8usize, 64, 256] {
        let data: Vec<u8> = (0..size).map(|i| i as u8).collect();

        group.bench_with_input(BenchmarkId::new("crc16_table", size), &data, |b, data| {
            b.iter(|| black_box(crc16(black_box(data))))
        });
        group.bench_with_input(BenchmarkId::new("crc16_bitwise", size), &data, |b, data| {
            b.iter(|| black_box(crc16_bitwise(black_box(data))))
        });
        group.bench_with_input(BenchmarkId::new("lrc", size), &data, |b, data| {
            b.iter(|| black_box(lrc(black_box(data))))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_checksums);
criterion_main!(benches);
