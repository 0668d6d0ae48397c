mod lmsr;

pub use lmsr::{DEFAULT_LIQUIDITY, Lmsr, PricingError, Prices, cost, potential, price};
