pub mod catalog_import;
pub mod categories;
pub mod category_setup;
pub mod product_import;
