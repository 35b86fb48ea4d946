//! Command implementations.

pub mod admin;
pub mod cart;
pub mod products;

use std::io::Write;

use techmart_storefront::StorefrontConfig;
use techmart_storefront::catalog::Catalog;
use techmart_storefront::supabase::SupabaseClient;

use crate::render::Style;

/// Catalog over the anon client.
fn catalog(config: &StorefrontConfig) -> Catalog<SupabaseClient> {
    Catalog::new(SupabaseClient::new(&config.supabase), config.cache_ttl)
}

fn style(config: &StorefrontConfig) -> Style<'_> {
    Style {
        currency: &config.currency_symbol,
        placeholder: &config.placeholder_image,
    }
}

/// Write command output to stdout. A closed pipe is not an error.
fn emit(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}
