pub mod elastic;

pub use elastic::ElasticStore;
