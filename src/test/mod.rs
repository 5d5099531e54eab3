mod account;
mod admin;
mod analytics;
mod test_utils;
