pub mod dates;
pub mod lodgify;
pub mod otc_rows;
pub mod pagination;
pub mod properties;
pub mod report;
