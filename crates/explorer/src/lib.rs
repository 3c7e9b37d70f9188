pub mod abi;
pub mod coingecko;
pub mod etherscan;
pub mod http;
pub mod units;

pub use abi::classify_abi;
pub use coingecko::PriceClient;
pub use etherscan::EtherscanClient;
pub use units::scale_units;
