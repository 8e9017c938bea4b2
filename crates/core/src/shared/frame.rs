use ndarray::ArrayView3;

use crate::detection::domain::candidate_box::CandidateBox;

/// A single decoded video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the sampling and
/// aggregation layers treat pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame in decode order, counted from 0.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels covered by `bbox` into a new frame.
    ///
    /// Returns `None` when the box is degenerate or not fully inside the frame.
    pub fn crop(&self, bbox: &CandidateBox) -> Option<Frame> {
        if !bbox.is_within(self.width, self.height) {
            return None;
        }

        let x1 = bbox.x1 as usize;
        let y1 = bbox.y1 as usize;
        let x2 = bbox.x2 as usize;
        let y2 = bbox.y2 as usize;
        let channels = self.channels as usize;
        let row_bytes = self.width as usize * channels;

        let mut data = Vec::with_capacity((x2 - x1) * (y2 - y1) * channels);
        for row in y1..y2 {
            let start = row * row_bytes + x1 * channels;
            let end = row * row_bytes + x2 * channels;
            data.extend_from_slice(&self.data[start..end]);
        }

        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.channels,
            self.index,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
