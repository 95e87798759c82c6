use criterion::{BatchSize, Criterion, Throughput};
use libgsm::modem::{Modem, Terminators};

use super::{Link, Ticks};

fn noisy_reply(noise: usize) -> Vec<u8> {
    let mut reply: Vec<u8> = (0..noise).map(|i| b'a' + (i % 26) as u8).collect();
    reply.extend_from_slice(b"\r\nSEND OK\r\n");
    reply
}

pub fn bench_wait_response(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");
    for noise in [0usize, 256, 4096] {
        let reply = noisy_reply(noise);
        group.throughput(Throughput::Bytes(reply.len() as u64));
        group.bench_function(format!("wait_for/{noise}"), |b| {
            b.iter_batched_ref(
                || {
                    let mut link = Link::default();
                    link.push(&reply);
                    let modem: Modem<Link, Ticks> = Modem::new(link, Ticks::default());
                    modem
                },
                |modem| {
                    let t = Terminators::new(&[b"\r\nSEND OK"]);
                    assert_eq!(modem.wait_for(10_000, &t), Some(1));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

pub fn bench_notification_storm(c: &mut Criterion) {
    let mut stream = Vec::new();
    for i in 0..64 {
        stream.extend_from_slice(format!("\r\n+QIRDI: 0,1,{}\r\n", i % 6).as_bytes());
    }
    stream.extend_from_slice(b"\r\nOK\r\n");

    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("notification_storm", |b| {
        b.iter_batched_ref(
            || {
                let mut modem: Modem<Link, Ticks> = Modem::new(Link::default(), Ticks::default());
                modem.connect(0, "example.com", 80, false).expect("connect");
                modem.transport_mut().push(&stream);
                modem
            },
            |modem| assert_eq!(modem.wait_response(10_000), Some(1)),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}
