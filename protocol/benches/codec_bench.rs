// Codec & signing benchmarks for the wirepeer protocol client.
//
// Covers wallet generation, transaction signing and verification, binary
// encode/decode at various slip counts, and the JSON form.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use wirepeer_protocol::transaction::{sign_transaction, Slip, Transaction};
use wirepeer_protocol::wallet::Wallet;

fn transaction_with(wallet: &Wallet, slips: usize, data_len: usize) -> Transaction {
    let recipient = Wallet::generate().public_key();
    (0..slips).fold(
        Transaction::default()
            .with_timestamp(1_700_000_000_000)
            .set_data(vec![0xab; data_len]),
        |tx, i| {
            tx.add_from(Slip::new(wallet.public_key(), 1_000 + i as u64))
                .add_to(Slip::new(recipient, 1_000 + i as u64))
        },
    )
}

fn bench_wallet_generation(c: &mut Criterion) {
    c.bench_function("wallet/generate", |b| {
        b.iter(Wallet::generate);
    });
}

fn bench_sign_transaction(c: &mut Criterion) {
    let wallet = Wallet::generate();
    let tx = transaction_with(&wallet, 2, 64);

    c.bench_function("transaction/sign", |b| {
        b.iter(|| {
            let mut tx = tx.clone();
            sign_transaction(&mut tx, &wallet).unwrap();
        });
    });
}

fn bench_verify_transaction(c: &mut Criterion) {
    let wallet = Wallet::generate();
    let mut tx = transaction_with(&wallet, 2, 64);
    tx.sign(&wallet).unwrap();

    c.bench_function("transaction/verify", |b| {
        b.iter(|| black_box(tx.verify_signature()));
    });
}

fn bench_codec(c: &mut Criterion) {
    let wallet = Wallet::generate();
    let mut group = c.benchmark_group("transaction/codec");

    for slips in [1, 10, 100, 1_000] {
        let mut tx = transaction_with(&wallet, slips, 256);
        tx.sign(&wallet).unwrap();
        let bytes = tx.serialize(true).unwrap();

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("serialize", slips), &tx, |b, tx| {
            b.iter(|| tx.serialize(true).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("deserialize", slips), &bytes, |b, bytes| {
            b.iter(|| Transaction::deserialize(bytes).unwrap());
        });
    }

    group.finish();
}

fn bench_json(c: &mut Criterion) {
    let wallet = Wallet::generate();
    let mut tx = transaction_with(&wallet, 10, 256);
    tx.sign(&wallet).unwrap();
    let text = tx.to_json_string().unwrap();

    c.bench_function("transaction/to_json", |b| {
        b.iter(|| tx.to_json_string().unwrap());
    });
    c.bench_function("transaction/from_json", |b| {
        b.iter(|| Transaction::from_json_str(&text).unwrap());
    });
}

criterion_group!(
    benches,
    bench_wallet_generation,
    bench_sign_transaction,
    bench_verify_transaction,
    bench_codec,
    bench_json,
);
criterion_main!(benches);
