mod seo;
mod views;

pub use seo::Meta;
pub use views::{
    error_404, flash_redirect, index, template_to_response, ErrorTemplate, HtmlResult,
};
