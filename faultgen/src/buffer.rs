use std::{hint::black_box, mem, thread, time::Duration};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub(crate) enum LayoutError {
    #[error("element of {element} bytes doesn't fit into a page of {page} bytes")]
    PageTooSmall { page: usize, element: usize },
    #[error("buffer of {pages} pages with {per_page} elements per page overflows usize")]
    Overflow { pages: usize, per_page: usize },
}

// SampleBuffer is a zero filled array that spans exactly `pages` pages.
// memory is requested with alloc_zeroed, so the kernel doesn't back it with physical pages
// until each page is written for the first time.
#[derive(Debug)]
pub(crate) struct SampleBuffer {
    data: Vec<u64>,
    elements_per_page: usize,
}

impl SampleBuffer {
    pub(crate) const ELEMENT_SIZE: usize = mem::size_of::<u64>();

    pub(crate) fn new(page_size: usize, pages: usize) -> Result<Self, LayoutError> {
        let elements_per_page = page_size / Self::ELEMENT_SIZE;
        if elements_per_page == 0 {
            return Err(LayoutError::PageTooSmall {
                page: page_size,
                element: Self::ELEMENT_SIZE,
            });
        }
        let len = elements_per_page.checked_mul(pages).ok_or(LayoutError::Overflow {
            pages,
            per_page: elements_per_page,
        })?;
        Ok(Self {
            data: vec![0; len],
            elements_per_page,
        })
    }

    pub(crate) fn elements_per_page(&self) -> usize {
        self.elements_per_page
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    // touch_pages writes one element per page, jumping a whole page worth of elements on every step,
    // and sleeps for interval after each write. on_touch receives the offset of the written element.
    pub(crate) fn touch_pages(&mut self, interval: Duration, mut on_touch: impl FnMut(usize)) -> usize {
        let mut touched = 0;
        let mut offset = 0;
        while offset < self.data.len() {
            let slot = &mut self.data[offset];
            *slot = offset as u64 + 1;
            // the store has to land before the sleep
            black_box(slot);
            on_touch(offset);
            touched += 1;
            offset += self.elements_per_page;
            thread::sleep(interval);
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_single_page_single_touch() {
        let mut buffer = SampleBuffer::new(4096, 1).expect("layout");
        assert_eq!(buffer.elements_per_page(), 512);
        assert_eq!(buffer.len(), 512);
        let mut offsets = vec![];
        let touched = buffer.touch_pages(Duration::ZERO, |offset| offsets.push(offset));
        assert_eq!(touched, 1);
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_touches_page_aligned_offsets() {
        let mut buffer = SampleBuffer::new(4096, 4).expect("layout");
        let mut offsets = vec![];
        buffer.touch_pages(Duration::ZERO, |offset| offsets.push(offset));
        assert_eq!(offsets, vec![0, 512, 1024, 1536]);
        assert_eq!(buffer.data.iter().filter(|v| **v != 0).count(), 4);
    }

    #[test]
    fn test_page_smaller_than_element() {
        assert_eq!(
            SampleBuffer::new(4, 1).unwrap_err(),
            LayoutError::PageTooSmall { page: 4, element: 8 }
        );
    }

    #[test]
    fn test_overflowing_layout() {
        assert!(matches!(
            SampleBuffer::new(4096, usize::MAX),
            Err(LayoutError::Overflow { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_one_touch_per_page(pages in 1usize..64, shift in 3u32..14) {
            let page_size = 1usize << shift;
            let mut buffer = SampleBuffer::new(page_size, pages).expect("layout");
            let touched = buffer.touch_pages(Duration::ZERO, |offset| {
                assert_eq!(offset % (page_size / SampleBuffer::ELEMENT_SIZE), 0);
            });
            prop_assert_eq!(touched, pages);
        }
    }
}
