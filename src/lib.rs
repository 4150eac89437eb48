pub mod record;
pub mod chunk;
pub mod symbol;
pub mod pool;
pub mod emit;
pub mod collect;
pub mod reassemble;
pub mod file;
pub mod pipeline;
pub mod error;

pub use record::{Chunk, RecordLayout, RecordError, encode_record, decode_record};
pub use chunk::{ChunkSet, ChunkError, split};
pub use symbol::{SymbolCodec, SymbolError, TextCodec, CommandCodec, EcLevel};
pub use emit::{emit_all, EmitOptions, EmitReport, EmitError, AggregatedError};
pub use collect::{collect_all, collect_files, CollectOptions, CollectReport, CollectError};
pub use reassemble::{validate, materialize, SortedChunkSet, ValidateError, MaterializeError};
pub use file::FileBuffer;
pub use pipeline::{encode_file, restore_file, verify_file, Source};
pub use error::{Error, Result};
