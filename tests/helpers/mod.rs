pub mod mock_handler;
pub mod test_metrics;
