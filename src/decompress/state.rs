//! Frame decoding state

use crate::checksum::ContentChecksum;
use crate::common::BLOCK_SIZE_MAX;
use crate::frame::{BlockHeader, FrameHeader};

/// Position of the decoder within the frame grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameState {
    AwaitingFrameHeader,
    AwaitingBlockHeader,
    ReadingBlockPayload(BlockHeader),
    AwaitingChecksum,
    Done,
}

/// Everything carried from one block of a frame to the next
#[derive(Debug)]
pub(crate) struct FrameProgress {
    pub header: FrameHeader,
    pub window_size: usize,
    /// Dictionary tail followed by decoded content still in reach
    pub history: Vec<u8>,
    /// Content bytes produced so far
    pub produced: u64,
    pub checksum: ContentChecksum,
    pub rep: u32,
}

impl FrameProgress {
    pub fn new(header: FrameHeader, dictionary: Option<&[u8]>) -> Self {
        let window_size = header.window_size() as usize;
        let mut history = Vec::new();
        if let Some(content) = dictionary {
            let usable = content.len().min(window_size);
            history.extend_from_slice(&content[content.len() - usable..]);
        }
        Self {
            header,
            window_size,
            history,
            produced: 0,
            checksum: ContentChecksum::new(),
            rep: 1,
        }
    }

    /// Forget content no back-reference can reach
    pub fn slide(&mut self) {
        let slack = (self.window_size / 4).max(BLOCK_SIZE_MAX);
        if self.history.len() > self.window_size + slack {
            let drop = self.history.len() - self.window_size;
            self.history.drain(..drop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(window_log: u8) -> FrameHeader {
        FrameHeader {
            has_checksum: false,
            dictionary_id: None,
            content_size: None,
            window_log,
        }
    }

    #[test]
    fn test_dictionary_tail_primes_history() {
        let dictionary = vec![7u8; 3000];
        let progress = FrameProgress::new(header(10), Some(&dictionary));
        assert_eq!(progress.history.len(), 1024);
        assert_eq!(progress.rep, 1);
    }

    #[test]
    fn test_slide_keeps_window() {
        let mut progress = FrameProgress::new(header(10), None);
        progress.history = vec![1u8; BLOCK_SIZE_MAX + 2000];
        progress.slide();
        assert_eq!(progress.history.len(), 1024);
    }
}
