use super::*;
use crate::column::{new_column, Base, Column, LowCardinality, Nullable, StringColumn};
use crate::config::{CompressionMethod, DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION};
use crate::kernels::METHOD_LZ4;
use crate::types::Value;
use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

fn config(compression: CompressionMethod) -> WireConfig {
    WireConfig {
        compression,
        ..WireConfig::default()
    }
}

/// Two named columns, `A UInt64` and `B String`, with ten rows each.
fn sample_columns() -> (Base<u64>, StringColumn) {
    let mut a = Base::<u64>::new();
    a.set_name(b"A");
    let mut b = StringColumn::new();
    b.set_name(b"B");
    for i in 0..10u64 {
        a.append(i * 1000);
        b.append_str(&format!("row-{}", i));
    }
    (a, b)
}

fn named<C: ColumnBasic>(mut column: C, name: &str) -> C {
    column.set_name(name.as_bytes());
    column
}

fn write_block(cfg: &WireConfig, columns: &[&dyn ColumnBasic]) -> Vec<u8> {
    let mut block = Block::new();
    let mut w = Writer::new();
    block.write_columns(&mut w, cfg, columns).unwrap();
    w.output
}

#[test]
fn test_end_to_end_roundtrip_with_every_compression() {
    for method in [
        CompressionMethod::None,
        CompressionMethod::Lz4,
        CompressionMethod::Zstd,
    ] {
        let cfg = config(method);
        let (a, b) = sample_columns();
        let bytes = write_block(&cfg, &[&a, &b]);

        // The placeholder stays outside the compressed frame.
        assert_eq!(bytes[0], 0);
        if method == CompressionMethod::Lz4 {
            assert_eq!(bytes[1 + 16], METHOD_LZ4);
        }

        let mut r = Reader::new(Cursor::new(bytes));
        let mut block = Block::new();
        block.read(&mut r, &cfg).unwrap();
        assert_eq!((block.num_columns, block.num_rows), (2, 10));

        let (mut a2, mut b2) = (Base::<u64>::new(), StringColumn::new());
        {
            let mut dst: [&mut dyn ColumnBasic; 2] = [&mut a2, &mut b2];
            block.read_columns_data(&mut r, &cfg, cfg.validate_data, &mut dst).unwrap();
        }
        assert_eq!(block.state(), BlockState::DataRead);
        assert_eq!(
            block.columns,
            vec![
                ColumnHeader::new("A", "UInt64"),
                ColumnHeader::new("B", "String")
            ]
        );
        assert_eq!(a2.name(), b"A");
        assert_eq!(a2.data(), a.data());
        assert_eq!(b2.data(), b.data());
        assert_eq!(r.buffered(), 0);
    }
}

#[test]
fn test_schema_block_then_data_block_with_reordered_destinations() {
    let cfg = config(CompressionMethod::Lz4);
    let (a, b) = sample_columns();

    let mut w = Writer::new();
    let mut block = Block::new();
    let schema_a = named(Base::<u64>::new(), "A");
    let schema_b = named(StringColumn::new(), "B");
    block.write(&mut w, &cfg, 0, &[&schema_a, &schema_b]).unwrap();
    block.reset();
    block.write(&mut w, &cfg, 10, &[&a, &b]).unwrap();

    let mut r = Reader::new(Cursor::new(w.output));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    assert_eq!(block.num_rows, 0);
    block.read_columns(&mut r, &cfg).unwrap();
    assert_eq!(block.state(), BlockState::ColumnsRead);

    let mut b2 = named(StringColumn::new(), "B");
    let mut a2 = named(Base::<u64>::new(), "A");
    let mut dst: [&mut dyn ColumnBasic; 2] = [&mut b2, &mut a2];
    block.reorder_columns(&mut dst).unwrap();
    assert_eq!(dst[0].name(), b"A");
    assert_eq!(dst[1].name(), b"B");

    block.reset();
    block.read(&mut r, &cfg).unwrap();
    block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap();
    drop(dst);
    assert_eq!(a2.data(), a.data());
    assert_eq!(b2.row_string(9), "row-9");
}

#[test]
fn test_row_count_mismatch_names_both_columns() {
    let cfg = WireConfig::default();
    let a = named(Base::from_values(vec![1u8, 2, 3]), "A");
    let b = named(Base::from_values(vec![1u8, 2]), "B");

    let mut block = Block::new();
    let mut w = Writer::new();
    let err = block.write(&mut w, &cfg, 3, &[&a, &b]).unwrap_err();
    match err {
        ChwireError::RowCountMismatch {
            first_column,
            first_count,
            column,
            count,
        } => {
            assert_eq!((first_column.as_str(), first_count), ("A", 3));
            assert_eq!((column.as_str(), count), ("B", 2));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(w.is_empty());
    assert_eq!(block.state(), BlockState::Failed);

    let err = block.write(&mut w, &cfg, 3, &[&a]).unwrap_err();
    assert!(matches!(err, ChwireError::InvalidState(_)));
    block.reset();
    assert_eq!(block.state(), BlockState::Idle);
    block.write(&mut w, &cfg, 3, &[&a]).unwrap();
}

#[test]
fn test_declared_row_count_must_match_columns() {
    let a = named(Base::from_values(vec![1i32]), "A");
    let mut block = Block::new();
    let err = block
        .write(&mut Writer::new(), &WireConfig::default(), 2, &[&a])
        .unwrap_err();
    assert!(matches!(err, ChwireError::Validation { .. }));
}

#[test]
fn test_reorder_swaps_and_reports_missing_names() {
    let mut block = Block::new();
    block.columns = vec![
        ColumnHeader::new("A", "UInt8"),
        ColumnHeader::new("B", "UInt8"),
    ];
    let mut a = named(Base::<u8>::new(), "A");
    let mut b = named(Base::<u8>::new(), "B");
    let mut dst: [&mut dyn ColumnBasic; 2] = [&mut b, &mut a];
    block.reorder_columns(&mut dst).unwrap();
    assert_eq!(dst[0].name(), b"A");
    assert_eq!(dst[1].name(), b"B");

    block.columns[1] = ColumnHeader::new("C", "UInt8");
    let err = block.reorder_columns(&mut dst).unwrap_err();
    assert!(matches!(err, ChwireError::ColumnNotFound { ref name } if name == "C"));
}

#[test]
fn test_custom_serialization_flag_fails_fast() {
    let mut w = Writer::new();
    w.string("");
    BlockInfo::default().write(&mut w);
    w.uvarint(1);
    w.uvarint(0);
    w.string("A");
    w.string("UInt8");
    w.uint8(1);

    let cfg = WireConfig::default();
    let mut r = Reader::new(Cursor::new(w.output));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let err = block.read_columns(&mut r, &cfg).unwrap_err();
    assert!(matches!(err.root_cause(), ChwireError::UnsupportedFeature(_)));
    assert_eq!(block.state(), BlockState::Failed);
}

#[test]
fn test_old_revision_omits_the_serialization_byte() {
    let new_cfg = WireConfig::default();
    let old_cfg = WireConfig {
        protocol_revision: DBMS_MIN_PROTOCOL_WITH_CUSTOM_SERIALIZATION - 1,
        ..WireConfig::default()
    };
    let (a, b) = sample_columns();
    let new_bytes = write_block(&new_cfg, &[&a, &b]);
    let old_bytes = write_block(&old_cfg, &[&a, &b]);
    assert_eq!(new_bytes.len(), old_bytes.len() + 2);

    let mut r = Reader::new(Cursor::new(old_bytes));
    let mut block = Block::new();
    block.read(&mut r, &old_cfg).unwrap();
    let (mut a2, mut b2) = (Base::<u64>::new(), StringColumn::new());
    let mut dst: [&mut dyn ColumnBasic; 2] = [&mut a2, &mut b2];
    block.read_columns_data(&mut r, &old_cfg, true, &mut dst).unwrap();
    drop(dst);
    assert_eq!(a2.data(), a.data());
}

#[test]
fn test_zero_row_block_has_no_prefix_or_body() {
    let cfg = WireConfig::default();
    let lc = named(LowCardinality::new(StringColumn::new()), "tag");
    let bytes = write_block(&cfg, &[&lc]);

    let mut expected = Writer::new();
    expected.string("");
    BlockInfo::default().write(&mut expected);
    expected.uvarint(1);
    expected.uvarint(0);
    expected.string("tag");
    expected.string("LowCardinality(String)");
    expected.uint8(0);
    assert_eq!(bytes, expected.output);

    let mut r = Reader::new(Cursor::new(bytes));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let mut dst_col = LowCardinality::new(StringColumn::new());
    dst_col.append(b"stale".to_vec());
    let mut dst: [&mut dyn ColumnBasic; 1] = [&mut dst_col];
    block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap();
    drop(dst);
    assert_eq!(dst_col.num_row(), 0);
    assert_eq!(dst_col.name(), b"tag");
}

#[test]
fn test_empty_blocks() {
    let cfg = config(CompressionMethod::Zstd);
    let mut block = Block::new();
    let mut w = Writer::new();
    assert!(matches!(
        block.write_columns(&mut w, &cfg, &[]).unwrap_err(),
        ChwireError::NoColumns
    ));

    block.reset();
    block.write_empty(&mut w, &cfg).unwrap();
    let mut r = Reader::new(Cursor::new(w.output));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    assert_eq!((block.num_columns, block.num_rows), (0, 0));
    block.read_columns_data(&mut r, &cfg, true, &mut []).unwrap();
}

#[test]
fn test_calls_out_of_order_are_rejected() {
    let cfg = WireConfig::default();
    let mut r = Reader::new(Cursor::new(Vec::new()));
    let mut block = Block::new();
    assert!(matches!(
        block.read_columns(&mut r, &cfg).unwrap_err(),
        ChwireError::InvalidState(_)
    ));
    // A truncated preamble fails the block.
    assert!(block.read(&mut r, &cfg).is_err());
    assert_eq!(block.state(), BlockState::Failed);
    assert!(matches!(
        block.read(&mut r, &cfg).unwrap_err(),
        ChwireError::InvalidState(_)
    ));
}

#[test]
fn test_validation_failure_names_the_column() {
    let cfg = WireConfig::default();
    let (a, b) = sample_columns();
    let bytes = write_block(&cfg, &[&a, &b]);

    let mut r = Reader::new(Cursor::new(bytes));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let (mut wrong, mut b2) = (Base::<i32>::new(), StringColumn::new());
    let mut dst: [&mut dyn ColumnBasic; 2] = [&mut wrong, &mut b2];
    let err = block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap_err();
    assert!(err.to_string().contains("validate column \"A\""));
    assert!(matches!(err.root_cause(), ChwireError::TypeMismatch { .. }));
}

#[test]
fn test_max_frame_size_from_config_bounds_incoming_frames() {
    let (a, b) = sample_columns();
    let bytes = write_block(&config(CompressionMethod::Lz4), &[&a, &b]);

    let small = WireConfig::from_json(r#"{"compression": "lz4", "max_frame_size": 16}"#).unwrap();
    let mut r = Reader::new(Cursor::new(bytes.clone()));
    let mut block = Block::new();
    let err = block.read(&mut r, &small).unwrap_err();
    assert!(matches!(err.root_cause(), ChwireError::Decompression(ref m) if m.contains("exceed")));
    assert_eq!(block.state(), BlockState::Failed);

    let roomy = WireConfig {
        max_frame_size: 1 << 20,
        ..config(CompressionMethod::Lz4)
    };
    let mut r = Reader::new(Cursor::new(bytes));
    Block::new().read(&mut r, &roomy).unwrap();
}

#[test]
fn test_write_rejects_structurally_broken_columns() {
    let mut broken = named(Nullable::new(Base::<u8>::new()), "n");
    broken.append_p(Some(1));
    broken.inner_mut().append(2);

    let mut block = Block::new();
    let mut w = Writer::new();
    let err = block
        .write(&mut w, &WireConfig::default(), 1, &[&broken])
        .unwrap_err();
    assert!(matches!(err, ChwireError::Validation { ref column, .. } if column == "n"));
    assert!(w.is_empty());
    assert_eq!(block.state(), BlockState::Failed);
}

#[test]
fn test_dictionary_default_key_survives_a_block_roundtrip() {
    let cfg = WireConfig::default();
    let mut keys = named(LowCardinality::new(StringColumn::new()), "k");
    keys.append_dict_nil();
    keys.append(b"v".to_vec());

    let mut w = Writer::new();
    Block::new().write(&mut w, &cfg, 2, &[&keys]).unwrap();

    let mut r = Reader::new(Cursor::new(w.output));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let mut back = LowCardinality::new(StringColumn::new());
    let mut dst: [&mut dyn ColumnBasic; 1] = [&mut back];
    block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap();
    drop(dst);
    assert_eq!(back.data(), vec![Vec::new(), b"v".to_vec()]);
}

#[test]
fn test_malformed_column_data_names_the_column() {
    let mut w = Writer::new();
    w.string("");
    BlockInfo::default().write(&mut w);
    w.uvarint(1);
    w.uvarint(1);
    w.string("n");
    w.string("Nullable(UInt8)");
    w.uint8(0);
    w.uint8(2); // not a valid null mask byte
    w.uint8(0);

    let cfg = WireConfig::default();
    let mut r = Reader::new(Cursor::new(w.output));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let mut col = Nullable::new(Base::<u8>::new());
    let mut dst: [&mut dyn ColumnBasic; 1] = [&mut col];
    let err = block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap_err();
    assert!(err.to_string().contains("invalid column \"n\""));
    assert!(matches!(err.root_cause(), ChwireError::Validation { ref column, .. } if column == "n"));
}

#[test]
fn test_insert_uses_the_server_header_names() {
    let cfg = WireConfig::default();
    let schema_a = named(Base::<u64>::new(), "A");
    let schema_b = named(StringColumn::new(), "B");
    let header_bytes = write_block(&cfg, &[&schema_a, &schema_b]);

    let mut r = Reader::new(Cursor::new(header_bytes));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    block.init_for_insert(&mut r, &cfg).unwrap();

    let mut a = Base::<u64>::new();
    let mut b = StringColumn::new();
    a.append(5);
    b.append_str("x");
    let mut w = Writer::new();
    block.write_columns(&mut w, &cfg, &[&a, &b]).unwrap();
    assert!(block.write_columns(&mut w, &cfg, &[&a]).is_err());

    let mut r = Reader::new(Cursor::new(w.output));
    let mut back = Block::new();
    back.read(&mut r, &cfg).unwrap();
    let (mut a2, mut b2) = (Base::<u64>::new(), StringColumn::new());
    let mut dst: [&mut dyn ColumnBasic; 2] = [&mut a2, &mut b2];
    back.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap();
    assert_eq!(back.columns[0].name, b"A".to_vec());
    assert_eq!(back.columns[1].name, b"B".to_vec());
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Vec<u8>>>>);

impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_unbuffered_writes_flush_per_column() {
    let buffered = WireConfig::default();
    let unbuffered = WireConfig {
        use_write_buffer: false,
        ..WireConfig::default()
    };
    let (a, b) = sample_columns();

    let recorder = Recorder::default();
    let mut w = Writer::with_sink(recorder.clone());
    Block::new()
        .write(&mut w, &unbuffered, 10, &[&a, &b])
        .unwrap();
    assert!(w.is_empty());

    let chunks = recorder.0.lock().unwrap().clone();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks.concat(), write_block(&buffered, &[&a, &b]));
}

#[test]
fn test_runtime_typed_columns_roundtrip() {
    let cfg = config(CompressionMethod::Lz4);
    let types = [
        ("tags", "Array(Nullable(String))"),
        ("kind", "LowCardinality(Nullable(String))"),
        ("attrs", "Map(String, Tuple(Int32, Float64))"),
    ];
    let mut columns: Vec<Box<dyn ColumnBasic>> = Vec::new();
    for (name, ty) in types {
        let mut col = new_column(ty).unwrap();
        col.set_name(name.as_bytes());
        columns.push(col);
    }
    for i in 0..20 {
        columns[0].append(Value::Array(vec![Value::from("t"), Value::Null]));
        columns[1].append(if i % 4 == 0 {
            Value::Null
        } else {
            Value::from(format!("k{}", i % 3))
        });
        columns[2].append(Value::Map(vec![(
            Value::from("m"),
            Value::Tuple(vec![Value::Int32(i), Value::Float64(0.5)]),
        )]));
    }

    let mut refs: Vec<&dyn ColumnBasic> = Vec::new();
    for c in &columns {
        refs.push(c.as_ref());
    }
    let bytes = write_block(&cfg, &refs);

    let mut r = Reader::new(Cursor::new(bytes));
    let mut block = Block::new();
    block.read(&mut r, &cfg).unwrap();
    let mut back: Vec<Box<dyn ColumnBasic>> =
        types.iter().map(|(_, ty)| new_column(ty).unwrap()).collect();
    let mut dst: Vec<&mut dyn ColumnBasic> = Vec::new();
    for c in back.iter_mut() {
        dst.push(c.as_mut());
    }
    block.read_columns_data(&mut r, &cfg, true, &mut dst).unwrap();
    drop(dst);
    for (original, decoded) in columns.iter().zip(&back) {
        assert_eq!(decoded.name(), original.name());
        assert_eq!(decoded.data(), original.data());
    }
}
