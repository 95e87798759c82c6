use criterion::{BatchSize, Criterion, Throughput};
use libgsm::modem::Modem;

use super::{Link, Ticks};

const CHUNK: usize = 200;

fn connected(secure: bool) -> Modem<Link, Ticks> {
    let link = Link {
        payload: vec![0x5a; CHUNK],
        ..Default::default()
    };
    let mut modem = Modem::new(link, Ticks::default());
    modem.connect(0, "example.com", 443, secure).expect("connect");
    modem
}

pub fn bench_plain_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Bytes(CHUNK as u64));
    group.bench_function("plain_notification_to_read", |b| {
        b.iter_batched_ref(
            || {
                let mut modem = connected(false);
                modem.transport_mut().push(b"\r\n+QIRDI: 0,1,0\r\n");
                modem
            },
            |modem| {
                let mut buf = [0u8; CHUNK];
                let n = modem.read(0, &mut buf).expect("read");
                assert_eq!(n, CHUNK);
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

pub fn bench_secure_pull(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Bytes(CHUNK as u64));
    group.bench_function("secure_eager_pull", |b| {
        b.iter_batched_ref(
            || {
                let mut modem = connected(true);
                modem.transport_mut().push(b"\r\n+QSSLURC: \"recv\",0\r\n");
                modem
            },
            |modem| {
                modem.pump().expect("pump");
                assert_eq!(modem.descriptor(0).map(|s| s.locally_buffered()), Ok(CHUNK));
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}
