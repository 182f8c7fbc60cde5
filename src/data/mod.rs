// Input data: trades and external reference prices

pub mod dataset;
pub mod reference;

pub use dataset::{Trade, TradeDataset, TradeSide};
pub use reference::{
    series_orientation, PriceReferenceIndex, PriceUpdate, ReferenceFeed, ReferencePricePoint,
    ReferenceSeries,
};
