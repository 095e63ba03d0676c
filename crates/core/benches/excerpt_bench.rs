use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tubescan_core::excerpt::{PaddedMatch, merge};

fn bench_merge(c: &mut Criterion) {
  let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor ".repeat(64);

  let hits: Vec<(usize, usize)> = text
    .match_indices("dolor")
    .chain(text.match_indices("tempor"))
    .map(|(start, needle)| (start, needle.len()))
    .collect();

  c.bench_function("merge_padded_matches", |b| {
    b.iter(|| {
      let matches: Vec<_> = hits
        .iter()
        .map(|&(start, len)| PaddedMatch::pad(start, len, 23, &text))
        .collect();
      black_box(merge(matches, &text))
    })
  });
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
