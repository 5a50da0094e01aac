use kht_crypto::{HmacSha256, KeyedHashTree, RootKey};

fn make_tree(factor: f64) -> KeyedHashTree<HmacSha256> {
    KeyedHashTree::new(
        RootKey::from_bytes(vec![0u8; 32]),
        HmacSha256::new(),
        1024,
        1 << 32,
        factor,
    )
    .unwrap()
}

#[divan::bench(args = [2.0, 8.0, 1024.0])]
fn derive_key(bencher: divan::Bencher, factor: f64) {
    let tree = make_tree(factor);
    bencher.bench(|| tree.derive_key(divan::black_box(0)).unwrap());
}

#[divan::bench(args = [16, 256, 4096])]
fn derive_range(bencher: divan::Bencher, blocks: usize) {
    let tree = make_tree(8.0);
    bencher
        .counter(divan::counter::ItemsCount::new(blocks))
        .bench(|| tree.derive_range(divan::black_box(0..blocks as u64 * 1024)).unwrap());
}

fn main() {
    divan::main();
}
