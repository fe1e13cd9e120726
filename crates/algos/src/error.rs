#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("vertex id {id} is out of range for a graph with {num_vertices} vertices")]
    OutOfRange { id: usize, num_vertices: usize },

    #[error("k-truss requested k_limit={k_limit} below the minimum of 3")]
    KBelowMinimum { k_limit: usize },

    #[error(transparent)]
    Builder(#[from] graph_builder::Error),
}
