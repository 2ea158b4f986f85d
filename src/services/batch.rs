//! Fixed-size batching over any iterator.

/// Iterator adapter yielding `Vec`s of at most `size` items.
///
/// The final batch may be shorter; an empty source yields nothing.
#[derive(Debug)]
pub struct Batches<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Batches<I> {
    /// Returns `None` for a zero batch size.
    pub fn new(inner: I, size: usize) -> Option<Self> {
        (size > 0).then_some(Self { inner, size })
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if batch.is_empty() { None } else { Some(batch) }
    }
}

/// Extension for `iter.batches(n)`.
pub trait BatchExt: Iterator + Sized {
    fn batches(self, size: usize) -> Option<Batches<Self>> {
        Batches::new(self, size)
    }
}

impl<I: Iterator> BatchExt for I {}
