use criterion::{criterion_group, criterion_main};

mod modem;

criterion_group!(
    benches,
    modem::matcher::bench_wait_response,
    modem::matcher::bench_notification_storm,
    modem::read::bench_plain_read,
    modem::read::bench_secure_pull
);
criterion_main!(benches);
