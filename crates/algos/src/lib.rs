pub mod bfs;
pub mod error;
pub mod pagerank;
pub mod triangle_count;
pub mod wcc;

pub use error::Error;

pub mod prelude {
    pub use crate::bfs::{bfs, BfsAlgorithm, BfsConfig, BfsResult};
    pub use crate::error::Error;
    pub use crate::pagerank::{page_rank, PageRankConfig, PageRankResult};
    pub use crate::triangle_count::{k_truss, triangle_count, KTrussConfig, KTrussResult, TriangleCountResult};
    pub use crate::wcc::{wcc, WccConfig, WccResult};
}
