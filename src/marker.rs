/// Hands out the placeholder attribute names that tie skeleton nodes to bindings.
///
/// One allocator lives for exactly one top-level compile. Nested templates and
/// slots draw from the same allocator, so markers never repeat within a component.
#[derive(Debug, Clone)]
pub struct MarkerAllocator {
    prefix: String,
    next: usize,
}

impl MarkerAllocator {
    pub fn new(prefix: &str) -> Self {
        MarkerAllocator {
            prefix: prefix.to_string(),
            next: 0,
        }
    }

    pub fn next_marker(&mut self) -> String {
        let marker = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        marker
    }

    /// Number of markers handed out so far.
    pub fn allocated(&self) -> usize {
        self.next
    }
}

pub fn selector_for(marker: &str) -> String {
    format!("[{}]", marker)
}
