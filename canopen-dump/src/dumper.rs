//! Main dumper API
//!
//! The [`Dumper`] owns the per-node state and turns timestamped frames into
//! decoded events, one frame at a time and strictly in arrival order.

use crate::classify::{classify, ObjectType};
use crate::descriptions::{ErrorDescriptions, StandardDescriptions};
use crate::dictionary::{ObjectDictionary, StandardDictionary};
use crate::format::LineWriter;
use crate::messages::MessageDecoder;
use crate::node_state::{NodeState, NodeStateTable};
use crate::options::DumpOptions;
use crate::sdo::SdoDecoder;
use crate::types::{CanFrame, DecodedEvent, Result, TimestampedFrame};
use std::io::Write;

/// Counters collected over one dump run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpStats {
    /// Frames read from the source
    pub frames: usize,
    /// Lines written
    pub printed: usize,
    /// Frames decoded but hidden by the category filter
    pub filtered: usize,
    /// Frames that did not map to a CANopen object
    pub unclassified: usize,
}

/// What became of one frame after decoding and filtering
enum Outcome {
    Shown(DecodedEvent),
    Filtered,
    Unclassified,
}

/// The CANopen dumper - entry point for decoding a frame stream
pub struct Dumper {
    options: DumpOptions,
    nodes: NodeStateTable,
    dictionary: Box<dyn ObjectDictionary>,
    descriptions: Box<dyn ErrorDescriptions>,
}

impl Dumper {
    /// Create a dumper; an options mask without category bits shows everything
    pub fn new(options: DumpOptions) -> Self {
        Self {
            options: options.resolve(),
            nodes: NodeStateTable::new(),
            dictionary: Box::new(StandardDictionary::new()),
            descriptions: Box::new(StandardDescriptions),
        }
    }

    /// Builder method: replace the object dictionary used for string detection
    pub fn with_dictionary(mut self, dictionary: impl ObjectDictionary + 'static) -> Self {
        self.dictionary = Box::new(dictionary);
        self
    }

    /// Builder method: replace the emergency error code table
    pub fn with_error_descriptions(mut self, descriptions: impl ErrorDescriptions + 'static) -> Self {
        self.descriptions = Box::new(descriptions);
        self
    }

    /// Resolved options in effect
    pub fn options(&self) -> DumpOptions {
        self.options
    }

    /// Decode state of a node, `None` for ids outside 1..=127
    pub fn node(&self, node_id: u8) -> Option<&NodeState> {
        self.nodes.get(node_id)
    }

    /// Decode one frame, updating node state, without applying the filter
    ///
    /// Fails only with [`DumpError::Unclassifiable`](crate::DumpError) for
    /// frames outside the CANopen predefined connection set.
    pub fn decode(&mut self, frame: &CanFrame) -> Result<DecodedEvent> {
        let msg = classify(frame)?;
        let node_id = msg.node_id;

        let event = match msg.object {
            ObjectType::Nmt => MessageDecoder::decode_nmt(frame),
            ObjectType::Sync => DecodedEvent::Sync,
            ObjectType::Timestamp => DecodedEvent::Timestamp,
            ObjectType::Emcy => {
                let device_type = self.nodes.get(node_id).map_or(0, |state| state.device_type);
                MessageDecoder::decode_emcy(node_id, frame, device_type, self.descriptions.as_ref())
            }
            ObjectType::Pdo(direction, number) => {
                MessageDecoder::decode_pdo(direction, number, node_id, frame)
            }
            ObjectType::Rsdo => DecodedEvent::Sdo {
                node_id,
                event: SdoDecoder::decode_request(
                    self.nodes.get_mut(node_id),
                    self.dictionary.as_ref(),
                    frame,
                ),
            },
            ObjectType::Tsdo => DecodedEvent::Sdo {
                node_id,
                event: SdoDecoder::decode_response(
                    self.nodes.get_mut(node_id),
                    self.dictionary.as_ref(),
                    frame,
                ),
            },
            ObjectType::Heartbeat => MessageDecoder::decode_heartbeat(node_id, frame),
        };

        Ok(event)
    }

    /// Decode one frame and apply the category filter
    ///
    /// Returns `None` for filtered and unclassifiable frames. State is
    /// updated either way.
    pub fn process(&mut self, frame: &TimestampedFrame) -> Option<DecodedEvent> {
        match self.filter(&frame.frame) {
            Outcome::Shown(event) => Some(event),
            Outcome::Filtered | Outcome::Unclassified => None,
        }
    }

    fn filter(&mut self, frame: &CanFrame) -> Outcome {
        match self.decode(frame) {
            Ok(event) if self.options.shows(event.category()) => Outcome::Shown(event),
            Ok(event) => {
                log::trace!("Filtered out: {}", event);
                Outcome::Filtered
            }
            Err(e) => {
                log::debug!("Skipping frame: {}", e);
                Outcome::Unclassified
            }
        }
    }

    /// Decode every frame of `source` and write one line per shown event
    ///
    /// A source error ends the run like end of input; only failures to write
    /// the output are returned as errors.
    pub fn dump<I, W>(&mut self, source: I, out: W) -> Result<DumpStats>
    where
        I: IntoIterator<Item = Result<TimestampedFrame>>,
        W: Write,
    {
        let mut writer = LineWriter::new(out, self.options.print_timestamps());
        let mut stats = DumpStats::default();

        for item in source {
            let frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Frame source failed, stopping: {}", e);
                    break;
                }
            };

            stats.frames += 1;
            log::trace!("Frame 0x{:03X} dlc={}", frame.frame.can_id, frame.frame.dlc());

            match self.filter(&frame.frame) {
                Outcome::Shown(event) => {
                    writer.write_event(&frame, &event)?;
                    stats.printed += 1;
                }
                Outcome::Filtered => stats.filtered += 1,
                Outcome::Unclassified => stats.unclassified += 1,
            }
        }

        writer.flush()?;
        log::info!(
            "Dump finished: {} frames, {} printed, {} filtered, {} unclassified",
            stats.frames,
            stats.printed,
            stats.filtered,
            stats.unclassified
        );

        Ok(stats)
    }
}

impl Default for Dumper {
    fn default() -> Self {
        Self::new(DumpOptions::empty())
    }
}
