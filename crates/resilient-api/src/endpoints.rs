//! Request builders for the storefront API.
//!
//! Every builder returns an [`Endpoint`]: the request plus whether its
//! response may be cached. Reads are cacheable and keyed by
//! [`RequestSpec::cache_key`]; mutations are never cached, so a failing write
//! is never answered with stale data.

use resilient_api_executor::RequestSpec;
use serde_json::{json, Value};

/// One storefront operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    request: RequestSpec,
    cacheable: bool,
}

impl Endpoint {
    fn read(request: RequestSpec) -> Self {
        Self {
            request,
            cacheable: true,
        }
    }

    fn write(request: RequestSpec) -> Self {
        Self {
            request,
            cacheable: false,
        }
    }

    /// The request to send.
    pub fn request(&self) -> &RequestSpec {
        &self.request
    }

    /// Cache key of a cacheable endpoint.
    pub fn cache_key(&self) -> Option<String> {
        self.cacheable.then(|| self.request.cache_key())
    }

    /// Stops the response from being cached or served from cache.
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

/// A page of the product listing.
pub fn products(page: u32, size: u32) -> Endpoint {
    Endpoint::read(paged(RequestSpec::get("products"), page, size))
}

/// A page of products, cheapest first.
pub fn products_by_low_price(page: u32, size: u32) -> Endpoint {
    Endpoint::read(paged(RequestSpec::get("products/low_price"), page, size))
}

/// A page of products, most expensive first.
pub fn products_by_high_price(page: u32, size: u32) -> Endpoint {
    Endpoint::read(paged(RequestSpec::get("products/high_price"), page, size))
}

/// A page of the products in one category.
pub fn products_by_category(category_id: u64, page: u32, size: u32) -> Endpoint {
    let request = RequestSpec::get("products/category").query("categoryId", category_id);
    Endpoint::read(paged(request, page, size))
}

/// One product.
pub fn product(id: u64) -> Endpoint {
    Endpoint::read(RequestSpec::get(format!("products/{}", id)))
}

/// Products whose title matches `title`.
pub fn search_products(title: &str) -> Endpoint {
    Endpoint::read(RequestSpec::get("products/search").query("title", title))
}

/// Recently viewed products of the signed-in member.
pub fn recently_viewed() -> Endpoint {
    Endpoint::read(RequestSpec::get("products/lastly"))
}

/// Records a product view.
pub fn add_recently_viewed(member_id: u64, product_id: u64) -> Endpoint {
    Endpoint::write(
        RequestSpec::post("products/lastly")
            .json(json!({ "memberId": member_id, "productId": product_id })),
    )
}

/// Creates a product.
pub fn create_product(product: Value) -> Endpoint {
    Endpoint::write(RequestSpec::post("products").json(product))
}

/// Updates a product.
pub fn update_product(product: Value) -> Endpoint {
    Endpoint::write(RequestSpec::put("products").json(product))
}

/// Deletes a product.
pub fn delete_product(product_id: u64) -> Endpoint {
    Endpoint::write(RequestSpec::delete("products").json(json!({ "productId": product_id })))
}

/// Every category.
pub fn categories() -> Endpoint {
    Endpoint::read(RequestSpec::get("categories"))
}

/// Every order.
pub fn orders() -> Endpoint {
    Endpoint::read(RequestSpec::get("orders"))
}

/// One order.
pub fn order(order_id: u64) -> Endpoint {
    Endpoint::read(RequestSpec::get(format!("orders/{}", order_id)))
}

/// Orders of one member.
pub fn my_orders(member_id: u64) -> Endpoint {
    Endpoint::read(RequestSpec::get("orders/my-order").query("memberId", member_id))
}

/// Places an order.
pub fn place_order(order: Value) -> Endpoint {
    Endpoint::write(RequestSpec::post("orders/place-order").json(order))
}

/// Cart contents of one member.
pub fn cart(member_id: u64) -> Endpoint {
    Endpoint::read(RequestSpec::get("carts").query("memberId", member_id))
}

/// Adds an item to a cart.
pub fn add_to_cart(item: Value) -> Endpoint {
    Endpoint::write(RequestSpec::post("carts").json(item))
}

/// Changes the quantity of a cart item.
pub fn update_cart_item(cart_id: u64, quantity: u32) -> Endpoint {
    Endpoint::write(
        RequestSpec::put("carts").json(json!({ "cartId": cart_id, "quantity": quantity })),
    )
}

/// Removes one cart item.
pub fn remove_from_cart(cart_id: u64) -> Endpoint {
    Endpoint::write(RequestSpec::delete("carts").query("cartId", cart_id))
}

/// Empties a member's cart.
pub fn clear_cart(member_id: u64) -> Endpoint {
    Endpoint::write(RequestSpec::delete("carts-all").query("memberId", member_id))
}

/// Smallest request that proves the upstream is answering. Never cached.
pub fn health() -> Endpoint {
    Endpoint::write(paged(RequestSpec::get("products"), 0, 1))
}

fn paged(request: RequestSpec, page: u32, size: u32) -> RequestSpec {
    request.query("page", page).query("size", size)
}
