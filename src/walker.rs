use std::collections::BTreeSet;
use std::fmt::Debug;
use std::io::{Read, Seek, SeekFrom};

use fallible_streaming_iterator::FallibleStreamingIterator;
use serde::Serialize;

use crate::context::{ByteOrder, Container, Ds64Table, StreamContext};
use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::fourcc::FourCc;
use crate::DecodeOptions;

/// One chunk occurrence as found in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawChunk {
    pub identifier: FourCc,
    /// Size after padding, or the `ds64` value for `data`/`fact` in 64-bit mode.
    pub size: u64,
    /// Empty for identifiers whose payload is skipped. May be shorter than
    /// `size` when the stream is truncated.
    #[serde(skip)]
    pub payload: Vec<u8>,
    /// Absolute offset of the chunk identifier.
    pub offset: u64,
}

/// Walks the chunks of a RIFF-family stream, one at a time.
///
/// Construction reads the container header (and the `ds64` table when the
/// declared size says so); every `advance` then reads exactly one chunk and
/// leaves the cursor on the next chunk boundary.
pub struct ChunkWalker<'a, R: Read + Seek + Debug> {
    cursor: &'a mut ByteCursor<R>,
    context: StreamContext,
    skip_payload: BTreeSet<FourCc>,
    current: Option<RawChunk>,
    finished: bool,
}

impl<'a, R: Read + Seek + Debug> ChunkWalker<'a, R> {
    pub fn new(cursor: &'a mut ByteCursor<R>, options: &DecodeOptions) -> Result<Self> {
        cursor.seek(SeekFrom::Start(0))?;

        let master = FourCc(cursor.read_exact::<4>()?);
        let (container, byte_order) = Container::from_master(master)?;

        // a header cut short leaves nothing to walk
        let (declared_size, form_type) = match cursor.try_read_array::<4>()? {
            Some(size) => (
                byte_order.u32(size),
                cursor.try_read_array::<4>()?.map(FourCc).unwrap_or_default(),
            ),
            None => (0, FourCc::default()),
        };
        let finished = cursor.position() < 12;

        tracing::debug!(%master, ?container, ?byte_order, declared_size, "container header");
        if finished {
            tracing::debug!(read = cursor.position(), "container header truncated");
        } else if form_type != FourCc::WAVE {
            tracing::debug!(%form_type, "form type is not WAVE");
        }

        let ds64 = if !finished && declared_size == StreamContext::SIZE_SENTINEL {
            Some(Self::read_ds64(cursor, byte_order)?)
        } else {
            None
        };

        Ok(Self {
            cursor,
            context: StreamContext {
                master,
                container,
                byte_order,
                form_type,
                declared_size,
                ds64,
            },
            skip_payload: options.skip_payload.clone(),
            current: None,
            finished,
        })
    }

    fn read_ds64(cursor: &mut ByteCursor<R>, byte_order: ByteOrder) -> Result<Ds64Table> {
        match cursor.try_read_array::<4>()? {
            Some(id) if FourCc(id) == FourCc::DS64 => {}
            Some(id) => {
                return Err(Error::MissingDs64 {
                    found: format!("'{}'", FourCc(id)),
                })
            }
            None => {
                return Err(Error::MissingDs64 {
                    found: "end of stream".to_string(),
                })
            }
        }

        let chunk_size = byte_order.u32(cursor.read_exact::<4>()?);
        let body = cursor.read_exact::<{ Ds64Table::BODY_LEN }>()?;
        let table = Ds64Table::parse(byte_order, chunk_size, &body);
        cursor.skip(table.table_len())?;

        tracing::debug!(
            riff_size = table.riff_size,
            data_size = table.data_size,
            sample_count = table.sample_count,
            table_entry_count = table.table_entry_count,
            "ds64 table"
        );
        Ok(table)
    }

    pub fn context(&self) -> &StreamContext {
        &self.context
    }

    /// Scans forward from just after an `afsp` identifier to the next `DISP`
    /// or `LIST`. Returns `false` when the stream ends first.
    fn skip_afsp(&mut self) -> Result<bool> {
        let start = self.cursor.position();
        loop {
            let Some(next) = self.cursor.try_read_array::<4>()? else {
                tracing::debug!(start, "afsp scan reached end of stream");
                return Ok(false);
            };
            if matches!(&next, b"DISP" | b"LIST") {
                self.cursor.rewind(4)?;
                tracing::debug!(start, end = self.cursor.position(), "skipped afsp");
                return Ok(true);
            }
            self.cursor.rewind(3)?;
        }
    }

    /// Reads the size field that follows `identifier`. `None` means the stream
    /// ended inside the field.
    fn read_size(&mut self, identifier: FourCc) -> Result<Option<u64>> {
        let Some(field) = self.cursor.try_read_array::<4>()? else {
            return Ok(None);
        };

        let size = match (&self.context.ds64, identifier) {
            (Some(table), FourCc::DATA) => table.data_size,
            (Some(table), FourCc::FACT) => table.sample_count,
            _ => u64::from(self.context.byte_order.u32(field)),
        };

        // bext is routinely written with an odd size and no pad byte
        if size % 2 != 0 && identifier != FourCc::BEXT {
            Ok(Some(size.saturating_add(1)))
        } else {
            Ok(Some(size))
        }
    }

    fn read_chunk(&mut self) -> Result<Option<RawChunk>> {
        loop {
            let offset = self.cursor.position();
            let Some(id) = self.cursor.try_read_array::<4>()? else {
                return Ok(None);
            };
            let identifier = FourCc(id);

            if identifier == FourCc::AFSP {
                if !self.skip_afsp()? {
                    return Ok(None);
                }
                continue;
            }

            let Some(size) = self.read_size(identifier)? else {
                return Ok(None);
            };

            let payload = if self.skip_payload.contains(&identifier) {
                Vec::new()
            } else {
                self.cursor.read_up_to(size)?
            };
            let remaining = size - payload.len() as u64;
            if self.cursor.position().checked_add(remaining).is_some() {
                self.cursor.skip(remaining)?;
            } else {
                // no stream is this long, so the chunk runs to the end
                tracing::debug!(%identifier, offset, size, "chunk extends past any stream end");
                self.finished = true;
            }

            if self.context.is_wide() && identifier == FourCc::NULL {
                tracing::debug!(offset, size, "skipped null padding chunk");
                if self.finished {
                    return Ok(None);
                }
                continue;
            }

            tracing::debug!(%identifier, offset, size, read = payload.len(), "chunk");
            return Ok(Some(RawChunk {
                identifier,
                size,
                payload,
                offset,
            }));
        }
    }
}

impl<R: Read + Seek + Debug> FallibleStreamingIterator for ChunkWalker<'_, R> {
    type Item = RawChunk;
    type Error = Error;

    fn advance(&mut self) -> std::result::Result<(), Self::Error> {
        self.current = None;
        if self.finished {
            return Ok(());
        }

        match self.read_chunk() {
            Ok(Some(chunk)) => {
                self.current = Some(chunk);
                Ok(())
            }
            Ok(None) => {
                self.finished = true;
                Ok(())
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        self.current.as_ref()
    }
}
