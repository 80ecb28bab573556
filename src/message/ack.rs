//! ACK record body.
//!
//! ```text
//! struct {
//!     RecordNumber record_numbers<0..2^16-1>;
//! } ACK;
//!
//! struct {
//!     uint64 epoch;
//!     uint64 sequence_number;
//! } RecordNumber;
//! ```
//!
//! The record layer only emits ACKs (see `Bugs::ack_every_record`) and
//! skips them when reading, so this is all the structure it needs.

use nom::combinator::{all_consuming, map};
use nom::multi::{length_value, many0};
use nom::number::complete::{be_u16, be_u64};
use nom::sequence::tuple;
use nom::IResult;

use crate::Buf;

/// Epoch and sequence number of one acknowledged record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordNumber {
    pub epoch: u64,
    pub sequence_number: u64,
}

impl RecordNumber {
    pub const WIRE_SIZE: usize = 16;

    pub fn new(epoch: u64, sequence_number: u64) -> Self {
        RecordNumber {
            epoch,
            sequence_number,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        map(tuple((be_u64, be_u64)), |(epoch, sequence_number)| {
            RecordNumber::new(epoch, sequence_number)
        })(input)
    }

    pub fn serialize(&self, output: &mut Buf) {
        output.extend_from_slice(&self.epoch.to_be_bytes());
        output.extend_from_slice(&self.sequence_number.to_be_bytes());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckMessage {
    pub record_numbers: Vec<RecordNumber>,
}

impl AckMessage {
    /// ACK for records of one epoch.
    pub fn for_epoch(epoch: u16, sequence_numbers: &[u64]) -> Self {
        let record_numbers = sequence_numbers
            .iter()
            .map(|s| RecordNumber::new(epoch as u64, *s))
            .collect();
        AckMessage { record_numbers }
    }

    /// Parse the length prefixed list. A trailing partial record number
    /// is an error.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let list = all_consuming(many0(RecordNumber::parse));
        map(length_value(be_u16, list), |record_numbers| AckMessage {
            record_numbers,
        })(input)
    }

    pub fn serialize(&self, output: &mut Buf) {
        let len = self.record_numbers.len() * RecordNumber::WIRE_SIZE;
        output.extend_from_slice(&(len as u16).to_be_bytes());
        for number in &self.record_numbers {
            number.serialize(output);
        }
    }

    pub fn acknowledges(&self, epoch: u64, sequence_number: u64) -> bool {
        self.record_numbers
            .contains(&RecordNumber::new(epoch, sequence_number))
    }
}
