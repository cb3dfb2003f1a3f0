pub(crate) mod manager;
pub(crate) mod unit_file;
