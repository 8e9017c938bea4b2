use std::time::Instant;

use crate::detection::domain::region_proposer::RegionProposer;
use crate::detection::domain::text_recognizer::TextRecognizer;
use crate::detection::domain::zone_policy::ZonePolicy;
use crate::sampling::frame_sampler::SampledFrame;
use crate::shared::frame::Frame;
use crate::storage::domain::detection_record::DetectionRecord;

use super::pipeline_logger::PipelineLogger;
use super::region_filter::filter_boxes;

/// Where the recognizer looks within each sampled frame.
pub enum RegionStrategy {
    /// Recognize the whole frame as a single image.
    WholeFrame,
    /// Propose boxes, keep those passing the zone policy, and recognize each crop.
    Proposed {
        proposer: Box<dyn RegionProposer>,
        zone: ZonePolicy,
    },
}

/// Turns one sampled frame into one [`DetectionRecord`].
///
/// Never fails: a proposal error falls back to whole-frame recognition
/// and a recognition error only drops that crop's text.
pub struct DetectionAggregator {
    recognizer: Box<dyn TextRecognizer>,
    strategy: RegionStrategy,
}

impl DetectionAggregator {
    pub fn new(recognizer: Box<dyn TextRecognizer>, strategy: RegionStrategy) -> Self {
        Self {
            recognizer,
            strategy,
        }
    }

    pub fn aggregate(
        &mut self,
        sampled: &SampledFrame,
        logger: &mut dyn PipelineLogger,
    ) -> DetectionRecord {
        let frame = &sampled.frame;
        let index = sampled.position.frame_index;

        let texts = match &mut self.strategy {
            RegionStrategy::WholeFrame => {
                recognize_into(self.recognizer.as_mut(), frame, index, logger)
            }
            RegionStrategy::Proposed { proposer, zone } => {
                let t0 = Instant::now();
                let proposed = proposer.propose(frame);
                logger.timing("propose", t0.elapsed().as_secs_f64() * 1000.0);

                match proposed {
                    Ok(boxes) => {
                        let accepted = filter_boxes(&boxes, frame.width(), frame.height(), zone);
                        logger.metric("regions_per_frame", accepted.len() as f64);
                        let mut texts = Vec::new();
                        for bbox in &accepted {
                            // filter_boxes only keeps in-frame boxes
                            if let Some(crop) = frame.crop(bbox) {
                                texts.extend(recognize_into(
                                    self.recognizer.as_mut(),
                                    &crop,
                                    index,
                                    logger,
                                ));
                            }
                        }
                        texts
                    }
                    Err(e) => {
                        log::warn!(
                            "Region proposal failed on frame {index}, using whole frame: {e}"
                        );
                        recognize_into(self.recognizer.as_mut(), frame, index, logger)
                    }
                }
            }
        };

        let record = DetectionRecord::new(sampled.position, texts);
        logger.metric("texts_per_frame", record.texts.len() as f64);
        record
    }
}

fn recognize_into(
    recognizer: &mut dyn TextRecognizer,
    image: &Frame,
    frame_index: u64,
    logger: &mut dyn PipelineLogger,
) -> Vec<String> {
    let t0 = Instant::now();
    let result = recognizer.recognize(image);
    logger.timing("recognize", t0.elapsed().as_secs_f64() * 1000.0);
    match result {
        Ok(texts) => texts,
        Err(e) => {
            log::warn!(
                "Recognition failed on a {}x{} region of frame {frame_index}, skipping it: {e}",
                image.width(),
                image.height()
            );
            Vec::new()
        }
    }
}
