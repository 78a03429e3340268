//! The block codec: framing of one block of rows on the wire.
//!
//! A block is a temporary-table name placeholder (always empty, never
//! compressed), then, inside the compression boundary when compression is on,
//! `BlockInfo`, `varint NumColumns`, `varint NumRows` and for every column its
//! name, type string, optional custom-serialization byte, type prefix and
//! body. Blocks with zero rows carry no prefix and no body.
//!
//! A `Block` tracks where it is in its lifecycle. Read path:
//! `Idle -> HeaderRead -> ColumnsRead | DataRead`. Write path:
//! `Idle | ColumnsRead | Written -> Written`. Any failure parks the block in
//! `Failed` until [`Block::reset`].
//!
//! `read_columns` and `read_columns_data` are alternatives after `read`, not
//! successive steps: the first serves zero-row schema blocks, the second reads
//! each column header inline with its data because the wire interleaves them.
//! `ColumnsRead -> DataRead` is therefore rejected with `InvalidState`.

use crate::column::{with_column_name, ColumnBasic, ColumnHeader};
use crate::config::WireConfig;
use crate::cursor::{Reader, Writer};
use crate::error::ChwireError;
use crate::kernels;

mod info;

pub use info::BlockInfo;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Idle,
    HeaderRead,
    ColumnsRead,
    DataRead,
    Written,
    Failed,
}

#[derive(Debug)]
pub struct Block {
    /// Column names and types from the last header read, in wire order.
    pub columns: Vec<ColumnHeader>,
    pub num_rows: u64,
    pub num_columns: u64,
    pub info: BlockInfo,
    /// Scratch buffer for a block body awaiting compression.
    compress_writer: Writer,
    state: BlockState,
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` with the reader's compression boundary and frame size limit set
/// per `cfg`, and always switches compression back off afterwards.
fn with_compression<T>(
    r: &mut Reader,
    cfg: &WireConfig,
    f: impl FnOnce(&mut Reader) -> Result<T, ChwireError>,
) -> Result<T, ChwireError> {
    r.set_max_frame_size(cfg.max_frame_size);
    r.set_compress(cfg.is_compressed());
    let result = f(r);
    r.set_compress(false);
    result
}

impl Block {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            num_rows: 0,
            num_columns: 0,
            info: BlockInfo::default(),
            compress_writer: Writer::new(),
            state: BlockState::Idle,
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Returns the block to `Idle`, keeping the scratch allocation.
    pub fn reset(&mut self) {
        self.compress_writer.reset();
        self.columns.clear();
        self.num_rows = 0;
        self.num_columns = 0;
        self.info = BlockInfo::default();
        self.state = BlockState::Idle;
    }

    fn expect_state(&self, op: &str, allowed: &[BlockState]) -> Result<(), ChwireError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ChwireError::InvalidState(format!(
                "{} is not allowed in state {:?}",
                op, self.state
            )))
        }
    }

    fn finish<T>(
        &mut self,
        result: Result<T, ChwireError>,
        next: BlockState,
    ) -> Result<T, ChwireError> {
        match result {
            Ok(v) => {
                self.state = next;
                Ok(v)
            }
            Err(e) => {
                log::debug!("block failed in state {:?}: {}", self.state, e);
                self.state = BlockState::Failed;
                Err(e)
            }
        }
    }

    //==============================================================================
    // Read path
    //==============================================================================

    /// Reads the block preamble: placeholder, `BlockInfo` and both counts.
    pub fn read(&mut self, r: &mut Reader, cfg: &WireConfig) -> Result<(), ChwireError> {
        self.expect_state("read", &[BlockState::Idle])?;
        let result = self.decode_preamble(r, cfg);
        self.finish(result, BlockState::HeaderRead)
    }

    fn decode_preamble(&mut self, r: &mut Reader, cfg: &WireConfig) -> Result<(), ChwireError> {
        r.byte_string()
            .map_err(|e| ChwireError::read("block: temporary table", e))?;
        let (info, num_columns, num_rows) = with_compression(r, cfg, |r| {
            let info = BlockInfo::read(r)?;
            let num_columns = r
                .uvarint()
                .map_err(|e| ChwireError::read("block: read NumColumns", e))?;
            let num_rows = r
                .uvarint()
                .map_err(|e| ChwireError::read("block: read NumRows", e))?;
            Ok((info, num_columns, num_rows))
        })?;
        self.info = info;
        self.num_columns = num_columns;
        self.num_rows = num_rows;
        log::debug!("block: header {} columns x {} rows", num_columns, num_rows);
        Ok(())
    }

    /// Reads the column headers of a block without rows, such as the schema
    /// block a server sends ahead of query results or an insert.
    pub fn read_columns(&mut self, r: &mut Reader, cfg: &WireConfig) -> Result<(), ChwireError> {
        self.expect_state("read_columns", &[BlockState::HeaderRead])?;
        let revision = cfg.protocol_revision;
        let num_columns = self.num_columns;
        let result = with_compression(r, cfg, |r| {
            let mut headers = Vec::with_capacity(num_columns.min(1024) as usize);
            for _ in 0..num_columns {
                headers.push(ColumnHeader::read(r, revision)?);
            }
            Ok(headers)
        });
        let result = result.map(|headers| self.columns = headers);
        self.finish(result, BlockState::ColumnsRead)
    }

    /// Reads every column of the block into `columns`, in order. Each column
    /// header is read into its destination first; with `validate` the declared
    /// type is checked before the body is decoded.
    pub fn read_columns_data(
        &mut self,
        r: &mut Reader,
        cfg: &WireConfig,
        validate: bool,
        columns: &mut [&mut dyn ColumnBasic],
    ) -> Result<(), ChwireError> {
        self.expect_state("read_columns_data", &[BlockState::HeaderRead])?;
        let result = if columns.len() as u64 != self.num_columns {
            Err(ChwireError::InvalidState(format!(
                "block has {} columns but {} destinations were supplied",
                self.num_columns,
                columns.len()
            )))
        } else {
            let revision = cfg.protocol_revision;
            let num_rows = self.num_rows as usize;
            with_compression(r, cfg, |r| {
                decode_columns(r, revision, num_rows, validate, columns)
            })
        };
        let result = result.map(|headers| self.columns = headers);
        log_metric!("event" = "read_block", "rows" = self.num_rows, "columns" = self.num_columns);
        self.finish(result, BlockState::DataRead)
    }

    /// Permutes `columns` in place so they follow the header order of this
    /// block. Fails on the first header name with no destination.
    pub fn reorder_columns(&self, columns: &mut [&mut dyn ColumnBasic]) -> Result<(), ChwireError> {
        for (i, header) in self.columns.iter().enumerate() {
            if columns.get(i).is_some_and(|c| c.name() == header.name.as_slice()) {
                continue;
            }
            let found = columns
                .iter()
                .skip(i)
                .position(|c| c.name() == header.name.as_slice());
            match found {
                Some(offset) => columns.swap(i, i + offset),
                None => {
                    return Err(ChwireError::ColumnNotFound {
                        name: header.name_str(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Reads the header block a server sends before accepting insert data.
    pub fn init_for_insert(&mut self, r: &mut Reader, cfg: &WireConfig) -> Result<(), ChwireError> {
        self.read_columns(r, cfg)
    }

    //==============================================================================
    // Write path
    //==============================================================================

    /// Encodes one block of `num_rows` rows. Names and types come from this
    /// block's header list when it has one, otherwise from each column.
    pub fn write(
        &mut self,
        w: &mut Writer,
        cfg: &WireConfig,
        num_rows: usize,
        columns: &[&dyn ColumnBasic],
    ) -> Result<(), ChwireError> {
        self.expect_state(
            "write",
            &[BlockState::Idle, BlockState::ColumnsRead, BlockState::Written],
        )?;
        log::debug!("block: write {} columns x {} rows", columns.len(), num_rows);
        let result = self
            .headers_for(columns)
            .and_then(|headers| {
                check_row_counts(&headers, columns, num_rows)?;
                check_columns(&headers, columns)?;
                Ok(headers)
            })
            .and_then(|headers| self.encode(w, cfg, num_rows, &headers, columns));
        self.finish(result, BlockState::Written)
    }

    /// Writes `columns` as one block, taking the row count from the first.
    pub fn write_columns(
        &mut self,
        w: &mut Writer,
        cfg: &WireConfig,
        columns: &[&dyn ColumnBasic],
    ) -> Result<(), ChwireError> {
        let first = columns.first().ok_or(ChwireError::NoColumns)?;
        self.write(w, cfg, first.num_row(), columns)
    }

    /// Writes the empty block that terminates an insert.
    pub fn write_empty(&mut self, w: &mut Writer, cfg: &WireConfig) -> Result<(), ChwireError> {
        self.expect_state(
            "write_empty",
            &[BlockState::Idle, BlockState::ColumnsRead, BlockState::Written],
        )?;
        let result = self.encode(w, cfg, 0, &[], &[]);
        self.finish(result, BlockState::Written)
    }

    fn headers_for(&self, columns: &[&dyn ColumnBasic]) -> Result<Vec<ColumnHeader>, ChwireError> {
        if self.columns.is_empty() {
            return Ok(columns
                .iter()
                .map(|c| ColumnHeader::new(c.name(), c.type_name()))
                .collect());
        }
        if self.columns.len() != columns.len() {
            return Err(ChwireError::InvalidState(format!(
                "block header lists {} columns but {} were supplied",
                self.columns.len(),
                columns.len()
            )));
        }
        Ok(self.columns.clone())
    }

    fn encode(
        &mut self,
        w: &mut Writer,
        cfg: &WireConfig,
        num_rows: usize,
        headers: &[ColumnHeader],
        columns: &[&dyn ColumnBasic],
    ) -> Result<(), ChwireError> {
        self.num_columns = columns.len() as u64;
        self.num_rows = num_rows as u64;

        // Temporary table name, outside the compression boundary.
        w.string("");

        if cfg.is_compressed() {
            let mut scratch = std::mem::take(&mut self.compress_writer);
            scratch.reset();
            let compressor = kernels::compressor_for(cfg.compression, cfg.zstd_level);
            let result =
                encode_body(&mut scratch, &self.info, cfg, num_rows, headers, columns, false)
                    .and_then(|_| {
                        w.compress(compressor.as_ref(), &scratch.output)
                            .map_err(|e| ChwireError::write("block: compress block", e))
                    });
            log_metric!(
                "event" = "write_block",
                "rows" = num_rows,
                "columns" = columns.len(),
                "body_bytes" = scratch.len()
            );
            self.compress_writer = scratch;
            result
        } else {
            let flush_each = !cfg.use_write_buffer;
            encode_body(w, &self.info, cfg, num_rows, headers, columns, flush_each)?;
            log_metric!("event" = "write_block", "rows" = num_rows, "columns" = columns.len());
            Ok(())
        }
    }
}

/// Every column must hold `num_rows` rows. The first column is the reference
/// a mismatch is reported against.
fn check_row_counts(
    headers: &[ColumnHeader],
    columns: &[&dyn ColumnBasic],
    num_rows: usize,
) -> Result<(), ChwireError> {
    let Some(first) = columns.first() else {
        return Ok(());
    };
    let first_count = first.num_row();
    for (header, column) in headers.iter().zip(columns) {
        if column.num_row() != first_count {
            return Err(ChwireError::RowCountMismatch {
                first_column: headers[0].name_str(),
                first_count,
                column: header.name_str(),
                count: column.num_row(),
            });
        }
    }
    if first_count != num_rows {
        return Err(ChwireError::Validation {
            column: headers[0].name_str(),
            reason: format!("has {} rows but the block declares {}", first_count, num_rows),
        });
    }
    Ok(())
}

/// Rejects buffered data the reader would refuse, such as dictionary keys
/// with no dictionary slot.
fn check_columns(headers: &[ColumnHeader], columns: &[&dyn ColumnBasic]) -> Result<(), ChwireError> {
    for (header, column) in headers.iter().zip(columns) {
        column
            .check_structure()
            .map_err(|e| with_column_name(e, &header.name_str()))?;
    }
    Ok(())
}

fn encode_body(
    target: &mut Writer,
    info: &BlockInfo,
    cfg: &WireConfig,
    num_rows: usize,
    headers: &[ColumnHeader],
    columns: &[&dyn ColumnBasic],
    flush_each: bool,
) -> Result<(), ChwireError> {
    info.write(target);
    target.uvarint(columns.len() as u64);
    target.uvarint(num_rows as u64);
    for (header, column) in headers.iter().zip(columns) {
        header.write(target, cfg.protocol_revision);
        if num_rows > 0 {
            column.header_writer(target);
            column.write_to(target);
        }
        if flush_each {
            target.flush().map_err(|e| {
                ChwireError::write(
                    format!("block: write block data for column {}", header.name_str()),
                    e,
                )
            })?;
        }
    }
    Ok(())
}

fn decode_columns(
    r: &mut Reader,
    revision: u64,
    num_rows: usize,
    validate: bool,
    columns: &mut [&mut dyn ColumnBasic],
) -> Result<Vec<ColumnHeader>, ChwireError> {
    let mut headers = Vec::with_capacity(columns.len());
    for column in columns.iter_mut() {
        if num_rows > 0 {
            column
                .header_reader(r, true, revision)
                .map_err(|e| ChwireError::read("column header", e))?;
        } else {
            *column.header_mut() =
                ColumnHeader::read(r, revision).map_err(|e| ChwireError::read("column header", e))?;
        }
        let name = column.header().name_str();
        log::trace!("block: column {:?} {}", name, column.header().type_str());
        if validate {
            column
                .validate()
                .map_err(|e| ChwireError::read(format!("validate column {:?}", name), e))?;
        }
        column.read_raw(num_rows, r).map_err(|e| {
            ChwireError::read(format!("column {:?} data", name), with_column_name(e, &name))
        })?;
        headers.push(column.header().clone());
    }
    Ok(headers)
}
