/// Passes every `stride`-th frame, counting from 1.
///
/// With a stride of 3 the 3rd, 6th, 9th... frames are processed.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    stride: u64,
    count: u64,
}

impl FrameSampler {
    /// A stride of 0 is treated as 1.
    pub fn new(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
            count: 0,
        }
    }

    /// Count one decoded frame and report whether it should be processed.
    pub fn advance(&mut self) -> bool {
        self.count += 1;
        self.count % self.stride == 0
    }

    /// Frames counted so far, processed or not.
    pub fn frames_seen(&self) -> u64 {
        self.count
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }
}
