use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bench::{encoded_rows, row_type, row_value};
use shared::algebraic::codec::{deserialize_product, serialize_product_value};
use shared::algebraic::Typespace;
use shared::serialize::{BinaryReader, Decode, Encode};
use spacesync_sdk::protocol::{
  BsatnRowList, CompressableQueryUpdate, DatabaseUpdate, QueryId, QueryUpdate, ServerMessage, TableUpdate,
};

fn benchmark_codec(c: &mut Criterion) {
  let mut group = c.benchmark_group("codec");
  let ty = row_type();
  let typespace = Typespace::new();
  let value = row_value(42);

  group.bench_function("row_serialize", |b| {
    b.iter(|| serialize_product_value(black_box(&ty), black_box(&value), &typespace).unwrap())
  });

  let encoded = serialize_product_value(&ty, &value, &typespace).unwrap();
  group.bench_function("row_deserialize", |b| {
    b.iter(|| {
      let mut reader = BinaryReader::new(black_box(&encoded));
      deserialize_product(&mut reader, &ty, &typespace).unwrap()
    })
  });

  let rows = encoded_rows(0, 1_000);
  let message = ServerMessage::SubscribeMultiApplied {
    request_id: 0,
    total_host_execution_duration_micros: 0,
    query_id: QueryId(0),
    update: DatabaseUpdate {
      tables: vec![TableUpdate {
        table_id: 0,
        table_name: "player".into(),
        num_rows: rows.len() as u64,
        updates: vec![CompressableQueryUpdate::Uncompressed(QueryUpdate {
          deletes: BsatnRowList::empty(),
          inserts: BsatnRowList::from_rows(rows.iter().map(Vec::as_slice)),
        })],
      }],
    },
  };
  let bytes = message.to_bytes();
  group.bench_function("server_message_decode_1k_rows", |b| {
    b.iter(|| ServerMessage::from_bytes(black_box(&bytes)).unwrap())
  });

  group.finish();
}

criterion_group!(benches, benchmark_codec);
criterion_main!(benches);
