//! Encoded pages
//!
//! A page is one contiguous block of a series: a delta-of-delta encoded time
//! column and a parallel value stream in the series' codec. Both buffers are
//! reference counted, so cloning a page or handing it to several readers never
//! copies the bytes.

use crate::codec::PageValue;
use crate::error::{ReadError, Result};
use std::marker::PhantomData;
use std::sync::Arc;
use tidal_compression::{TimestampDecoder, TimestampEncoder, ValueDecoder};
use tidal_core::{DataPoint, DataType, Timestamp};

/// Immutable encoded page of one series
#[derive(Debug, Clone)]
pub struct EncodedPage {
    data_type: DataType,
    count: usize,
    first_time: Option<Timestamp>,
    last_time: Option<Timestamp>,
    timestamps: Arc<[u8]>,
    values: Arc<[u8]>,
}

impl EncodedPage {
    /// Encode strictly time-ascending points into a page
    pub fn encode<T: PageValue>(points: &[DataPoint<T>]) -> Result<Self> {
        let mut times = TimestampEncoder::with_capacity(points.len() / 4 + 16);
        let mut prev: Option<Timestamp> = None;
        for point in points {
            if let Some(prev) = prev {
                if point.timestamp <= prev {
                    return Err(ReadError::PageLayout(format!(
                        "timestamps not strictly ascending: {} after {}",
                        point.timestamp, prev
                    )));
                }
            }
            times.encode(point.timestamp);
            prev = Some(point.timestamp);
        }

        let values: Vec<T> = points.iter().map(|p| p.value.clone()).collect();
        Ok(Self {
            data_type: T::DATA_TYPE,
            count: points.len(),
            first_time: points.first().map(|p| p.timestamp),
            last_time: prev,
            timestamps: times.finish().into(),
            values: T::encode_values(&values)?.into(),
        })
    }

    /// Assemble a page from already encoded buffers.
    ///
    /// The time column is decoded once to validate its ordering and record the
    /// page bounds; the value stream is only checked when read.
    pub fn from_parts(
        data_type: DataType,
        count: usize,
        timestamps: Vec<u8>,
        values: Vec<u8>,
    ) -> Result<Self> {
        // A time column holds a raw 64-bit first timestamp and at least one bit per later one
        let available = timestamps.len().saturating_mul(8);
        if count > 0 && (available < 64 || count - 1 > available - 64) {
            return Err(ReadError::PageLayout(format!(
                "{} timestamps cannot fit in {} bytes",
                count,
                timestamps.len()
            )));
        }
        let times = TimestampDecoder::new(&timestamps, count).decode_all()?;
        if let Some(pair) = times.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ReadError::PageLayout(format!(
                "timestamps not strictly ascending: {} after {}",
                pair[1], pair[0]
            )));
        }

        Ok(Self {
            data_type,
            count,
            first_time: times.first().copied(),
            last_time: times.last().copied(),
            timestamps: timestamps.into(),
            values: values.into(),
        })
    }

    /// Value domain of the page
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of points in the page
    pub fn len(&self) -> usize {
        self.count
    }

    /// Check if the page holds no points
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First timestamp in the page
    pub fn first_time(&self) -> Option<Timestamp> {
        self.first_time
    }

    /// Last timestamp in the page
    pub fn last_time(&self) -> Option<Timestamp> {
        self.last_time
    }

    /// Encoded size in bytes
    pub fn encoded_size(&self) -> usize {
        self.timestamps.len() + self.values.len()
    }

    /// Open a typed reader over the page
    pub fn reader<T: PageValue>(&self) -> Result<PageReader<'_, T>> {
        if T::DATA_TYPE != self.data_type {
            return Err(ReadError::TypeMismatch {
                expected: T::DATA_TYPE,
                actual: self.data_type,
            });
        }
        PageReader::new(self)
    }

    /// Decode every point of the page
    pub fn decode_all<T: PageValue>(&self) -> Result<Vec<DataPoint<T>>> {
        let mut reader = self.reader::<T>()?;
        let mut points = Vec::with_capacity(self.count);
        while let Some(point) = reader.read_next()? {
            points.push(point);
        }
        Ok(points)
    }
}

/// Cursor over one page.
///
/// The timestamp of the next point is decoded one step ahead so callers can
/// look at the current page time before deciding whether to decode its value.
pub struct PageReader<'a, T: PageValue> {
    times: TimestampDecoder<'a>,
    values: T::Decoder<'a>,
    current_time: Option<Timestamp>,
    _marker: PhantomData<T>,
}

impl<'a, T: PageValue> PageReader<'a, T> {
    fn new(page: &'a EncodedPage) -> Result<Self> {
        let mut times = TimestampDecoder::new(&page.timestamps, page.count);
        let current_time = times.decode()?;
        Ok(Self {
            times,
            values: T::decoder(&page.values, page.count)?,
            current_time,
            _marker: PhantomData,
        })
    }

    /// Timestamp of the next undecoded point
    pub fn current_time(&self) -> Option<Timestamp> {
        self.current_time
    }

    /// Check if the page has undecoded values
    pub fn has_next(&self) -> bool {
        self.current_time.is_some()
    }

    /// Decode the next point and advance
    pub fn read_next(&mut self) -> Result<Option<DataPoint<T>>> {
        let Some(timestamp) = self.current_time else {
            return Ok(None);
        };
        let value = self.values.decode_next()?.ok_or_else(|| {
            ReadError::PageLayout(format!("value stream ended before timestamp {}", timestamp))
        })?;
        self.advance(timestamp)?;
        Ok(Some(DataPoint::new(timestamp, value)))
    }

    /// Decode and discard the next value
    pub fn skip(&mut self) -> Result<()> {
        self.read_next().map(|_| ())
    }

    fn advance(&mut self, prev: Timestamp) -> Result<()> {
        self.current_time = self.times.decode()?;
        if let Some(next) = self.current_time {
            if next <= prev {
                return Err(ReadError::PageLayout(format!(
                    "timestamps not strictly ascending: {} after {}",
                    next, prev
                )));
            }
        }
        Ok(())
    }
}
