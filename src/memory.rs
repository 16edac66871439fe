//! Sparse, word-addressed, 32-bit memory with per-word validity tracking
//! (§3, §9). A flat `Vec<u32>` sized for the full `2^32` address space is not
//! portable, so storage is split into lazily-allocated pages, each holding
//! [`PAGE_WORDS`] words plus a parallel validity bitmap.

use std::collections::HashMap;

/// Words per page. Chosen so a page's value and validity arrays are a few
/// dozen KiB, a reasonable unit of lazy allocation.
pub const PAGE_WORDS: u32 = 16 * 1024;

struct Page {
    words: Box<[u32; PAGE_WORDS as usize]>,
    valid: Box<[bool; PAGE_WORDS as usize]>,
}

impl Page {
    fn new() -> Page {
        Page {
            words: Box::new([0u32; PAGE_WORDS as usize]),
            valid: Box::new([false; PAGE_WORDS as usize]),
        }
    }
}

/// A sparse, lazily-allocated, word-addressed memory region with a shadow
/// validity bit per word and a tracked high-water mark.
///
/// Used for both the code image (all words below its length are valid by
/// construction) and the data image (validity is set explicitly on write).
pub struct SparseMemory {
    pages: HashMap<u32, Box<Page>>,
    /// Exclusive upper bound of the highest address ever written.
    high_water_mark: u32,
}

impl SparseMemory {
    pub fn new() -> SparseMemory {
        SparseMemory {
            pages: HashMap::new(),
            high_water_mark: 0,
        }
    }

    fn split(address: u32) -> (u32, usize) {
        (address / PAGE_WORDS, (address % PAGE_WORDS) as usize)
    }

    /// Reads the word at `address`, and whether it was ever written.
    pub fn read(&self, address: u32) -> (u32, bool) {
        let (page_index, offset) = Self::split(address);
        match self.pages.get(&page_index) {
            Some(page) => (page.words[offset], page.valid[offset]),
            None => (0, false),
        }
    }

    /// Writes `value` to `address`, marking it valid and raising the
    /// high-water mark if needed.
    pub fn write(&mut self, address: u32, value: u32) {
        let (page_index, offset) = Self::split(address);
        let page = self
            .pages
            .entry(page_index)
            .or_insert_with(|| Box::new(Page::new()));
        page.words[offset] = value;
        page.valid[offset] = true;
        self.high_water_mark = self.high_water_mark.max(address.saturating_add(1));
    }

    /// Loads `words` starting at address 0, marking each word valid. Used
    /// to load an initial data image.
    pub fn load(&mut self, words: &[u32]) {
        for (address, &word) in words.iter().enumerate() {
            self.write(address as u32, word);
        }
    }

    /// Exclusive upper bound of the valid data region (`data_hi` in §4.3).
    pub fn high_water_mark(&self) -> u32 {
        self.high_water_mark
    }

    /// Iterates the valid words in `[0, high_water_mark)` in ascending
    /// address order, for the final data dump (§4.3).
    pub fn valid_words(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.high_water_mark).filter_map(move |address| {
            let (value, valid) = self.read(address);
            valid.then_some((address, value))
        })
    }
}

impl Default for SparseMemory {
    fn default() -> SparseMemory {
        SparseMemory::new()
    }
}

/// The loaded code image: an immutable sequence of words, all valid up to
/// `len()`. Addresses at or beyond `len()` are never valid code.
pub struct CodeImage {
    words: Vec<u32>,
}

impl CodeImage {
    pub fn new(words: Vec<u32>) -> CodeImage {
        CodeImage { words }
    }

    pub fn len(&self) -> u32 {
        self.words.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, address: u32) -> Option<u32> {
        self.words.get(address as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_raises_high_water_mark_and_sets_validity() {
        let mut mem = SparseMemory::new();
        assert_eq!(mem.high_water_mark(), 0);
        assert_eq!(mem.read(5), (0, false));

        mem.write(5, 0xABCD);
        assert_eq!(mem.read(5), (0xABCD, true));
        assert_eq!(mem.high_water_mark(), 6);

        mem.write(2, 1);
        assert_eq!(mem.high_water_mark(), 6, "mark is non-decreasing");
    }

    #[test]
    fn valid_words_skips_unwritten_addresses() {
        let mut mem = SparseMemory::new();
        mem.write(0, 0x11);
        mem.write(2, 0x22);
        let dump: Vec<_> = mem.valid_words().collect();
        assert_eq!(dump, vec![(0, 0x11), (2, 0x22)]);
    }

    #[test]
    fn writes_spanning_page_boundary() {
        let mut mem = SparseMemory::new();
        mem.write(PAGE_WORDS - 1, 1);
        mem.write(PAGE_WORDS, 2);
        assert_eq!(mem.read(PAGE_WORDS - 1), (1, true));
        assert_eq!(mem.read(PAGE_WORDS), (2, true));
    }
}
