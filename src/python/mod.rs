mod bindings;

use crate::core::{EncodingFamily, CL100K_BASE_PATTERN, O200K_BASE_PATTERN, R50K_BASE_PATTERN};
pub use bindings::{PyStreamingDecoder, PyTokenizer};

use pyo3::prelude::*;

/// ranktok - BPE tokenizer for tiktoken vocabularies.
///
/// - Linear-time segmentation and O(n log n) merging per piece
/// - Rayon parallelism for batch encoding
/// - Aho-Corasick special token matching with longest-match semantics
/// - UTF-8 streaming decoder for token-by-token output
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTokenizer>()?;
    m.add_class::<PyStreamingDecoder>()?;
    m.add("R50K_BASE_PATTERN", R50K_BASE_PATTERN)?;
    m.add("CL100K_BASE_PATTERN", CL100K_BASE_PATTERN)?;
    m.add("O200K_BASE_PATTERN", O200K_BASE_PATTERN)?;
    m.add("ENCODINGS", EncodingFamily::supported_names().to_vec())?;
    Ok(())
}
