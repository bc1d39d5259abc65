pub mod price_store;
