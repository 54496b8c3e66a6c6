//! Production collaborators: fetching the filings page and reading the workbook.

mod http;
pub mod links;
mod workbook;

pub use http::HttpSource;
pub use links::find_spreadsheet_link;
pub use workbook::{select_sheet, XlsxParser};
