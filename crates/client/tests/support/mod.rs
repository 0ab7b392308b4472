//! In-process stub of the Shoppy backend for integration tests.
//!
//! Implements the REST surface the client consumes, with in-memory state
//! the tests can seed and inspect. An adjustable delay on cart-line PATCH
//! requests makes in-flight overlap observable.

#![allow(dead_code)] // each integration test binary uses a subset

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use shoppy_client::{ClientConfig, CredentialStore, MemoryCredentialStore, Transport};

pub const TOKEN: &str = "stub-token";
pub const USER_ID: i64 = 1;
pub const OTHER_USER_ID: i64 = 2;
pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "Str0ng!pass";
const CREATED_AT: &str = "2026-01-01T00:00:00";

#[derive(Clone)]
pub struct CartRow {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct ReviewRow {
    pub id: i64,
    pub product_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub rating: i64,
    pub comment: String,
}

#[derive(Clone)]
pub struct Profile {
    pub email: String,
    pub full_name: Option<String>,
}

pub struct ServerState {
    pub cart: Mutex<BTreeMap<i64, CartRow>>,
    pub reviews: Mutex<Vec<ReviewRow>>,
    pub orders: Mutex<Vec<Value>>,
    pub last_order_request: Mutex<Option<Value>>,
    pub profile: Mutex<Profile>,
    pub patch_delay: Mutex<Duration>,
    hits: Mutex<BTreeMap<String, usize>>,
    next_id: AtomicI64,
}

impl ServerState {
    fn new() -> Self {
        Self {
            cart: Mutex::new(BTreeMap::new()),
            reviews: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            last_order_request: Mutex::new(None),
            profile: Mutex::new(Profile {
                email: EMAIL.to_owned(),
                full_name: Some("Ada".to_owned()),
            }),
            patch_delay: Mutex::new(Duration::ZERO),
            hits: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(100),
        }
    }

    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn seed_cart_line(&self, product_id: i64, quantity: i64) -> i64 {
        let id = self.next_id();
        self.cart.lock().unwrap().insert(
            id,
            CartRow {
                product_id,
                quantity,
            },
        );
        id
    }

    pub fn seed_review(
        &self,
        product_id: i64,
        user_id: i64,
        user_name: &str,
        rating: i64,
        comment: &str,
    ) -> i64 {
        let id = self.next_id();
        self.reviews.lock().unwrap().push(ReviewRow {
            id,
            product_id,
            user_id,
            user_name: user_name.to_owned(),
            rating,
            comment: comment.to_owned(),
        });
        id
    }

    pub fn set_patch_delay(&self, delay: Duration) {
        *self.patch_delay.lock().unwrap() = delay;
    }

    pub fn hits(&self, key: &str) -> usize {
        self.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn hit(&self, key: String) {
        *self.hits.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    fn cart_json(&self) -> Value {
        let cart = self.cart.lock().unwrap();
        let mut items = Vec::new();
        let mut total_quantity = 0;
        let mut total_amount = 0.0;
        for (id, row) in cart.iter() {
            total_quantity += row.quantity;
            total_amount += row.quantity as f64 * price(row.product_id);
            items.push(json!({
                "id": id,
                "quantity": row.quantity,
                "product": product_json(row.product_id),
            }));
        }
        json!({
            "items": items,
            "total_quantity": total_quantity,
            "total_amount": total_amount,
        })
    }

    fn profile_json(&self) -> Value {
        let profile = self.profile.lock().unwrap();
        json!({
            "id": USER_ID,
            "email": profile.email,
            "full_name": profile.full_name,
            "is_admin": false,
            "created_at": CREATED_AT,
        })
    }
}

pub fn price(product_id: i64) -> f64 {
    (product_id * 10) as f64
}

pub const CATEGORIES: [&str; 3] = ["Electronics", "Fashion & Apparel", "Books & Media"];

/// Ids of the fixed catalog the stub serves.
pub const CATALOG_IDS: [i64; 3] = [1, 2, 3];

pub fn category(product_id: i64) -> &'static str {
    CATEGORIES[(product_id as usize - 1) % CATEGORIES.len()]
}

fn product_json(product_id: i64) -> Value {
    json!({
        "id": product_id,
        "name": format!("Product {product_id}"),
        "category": category(product_id),
        "price": price(product_id),
        "image_url": null,
    })
}

fn full_product_json(product_id: i64) -> Value {
    json!({
        "id": product_id,
        "name": format!("Product {product_id}"),
        "description": format!("Description of product {product_id}"),
        "category": category(product_id),
        "price": price(product_id),
        "image_url": null,
        "stock": 10,
        "created_at": CREATED_AT,
    })
}

fn review_json(row: &ReviewRow) -> Value {
    json!({
        "id": row.id,
        "user_id": row.user_id,
        "user_name": row.user_name,
        "rating": row.rating,
        "comment": row.comment,
        "created_at": CREATED_AT,
    })
}

pub struct StubServer {
    pub base_url: String,
    pub state: Arc<ServerState>,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::new());
        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve stub");
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// A transport for this server, optionally pre-authenticated.
    pub fn transport(&self, token: Option<&str>) -> Transport {
        let store = match token {
            Some(token) => MemoryCredentialStore::with_token(token),
            None => MemoryCredentialStore::new(),
        };
        self.transport_with_store(Arc::new(store))
    }

    pub fn transport_with_store(&self, store: Arc<dyn CredentialStore>) -> Transport {
        let config = ClientConfig::for_api_url(&self.base_url).expect("config");
        Transport::with_store(&config, store).expect("transport")
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me).patch(update_me).delete(delete_me))
        .route("/products", get(list_products))
        .route("/products/categories", get(list_categories))
        .route("/products/search", get(search_products))
        .route("/products/{id}", get(get_product))
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_cart_item))
        .route(
            "/cart/items/{id}",
            axum::routing::patch(update_cart_item).delete(delete_cart_item),
        )
        .route("/products/{id}/reviews", get(list_reviews).post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
        .with_state(state)
}

fn authed(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": detail}))).into_response()
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(State(state): State<Arc<ServerState>>, Form(form): Form<LoginForm>) -> Response {
    let email = state.profile.lock().unwrap().email.clone();
    if form.username == email && form.password == PASSWORD {
        Json(json!({"access_token": TOKEN, "token_type": "bearer"})).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect email or password"})),
        )
            .into_response()
    }
}

async fn register(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if email == state.profile.lock().unwrap().email {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": state.next_id(),
            "email": email,
            "full_name": body["full_name"],
            "is_admin": false,
            "created_at": CREATED_AT,
        })),
    )
        .into_response()
}

async fn me(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    Json(state.profile_json()).into_response()
}

async fn update_me(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    if let Some(password) = body["password"].as_str()
        && password.len() < 8
    {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Value error, Password too short"}]})),
        )
            .into_response();
    }
    {
        let mut profile = state.profile.lock().unwrap();
        if let Some(email) = body["email"].as_str() {
            profile.email = email.to_owned();
        }
        if body.get("full_name").is_some() {
            profile.full_name = body["full_name"].as_str().map(str::to_owned);
        }
    }
    Json(state.profile_json()).into_response()
}

async fn delete_me(headers: HeaderMap) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct ProductFilter {
    category: Option<String>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

async fn list_products(
    State(state): State<Arc<ServerState>>,
    Query(filter): Query<ProductFilter>,
) -> Response {
    state.hit("GET /products".to_owned());
    let products: Vec<Value> = CATALOG_IDS
        .iter()
        .filter(|id| {
            filter
                .category
                .as_deref()
                .is_none_or(|wanted| category(**id) == wanted)
        })
        .map(|id| full_product_json(*id))
        .collect();
    Json(products).into_response()
}

async fn list_categories() -> Response {
    let categories: Vec<Value> = CATEGORIES
        .iter()
        .map(|c| json!({"value": c, "label": c}))
        .collect();
    Json(categories).into_response()
}

async fn search_products(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    state.hit("GET /products/search".to_owned());
    let needle = params.q.to_lowercase();
    let products: Vec<Value> = CATALOG_IDS
        .iter()
        .filter(|id| {
            format!("product {id}").contains(&needle)
                || category(**id).to_lowercase().contains(&needle)
        })
        .map(|id| full_product_json(*id))
        .collect();
    Json(products).into_response()
}

async fn get_product(State(state): State<Arc<ServerState>>, Path(id): Path<i64>) -> Response {
    state.hit(format!("GET /products/{id}"));
    if CATALOG_IDS.contains(&id) {
        Json(full_product_json(id)).into_response()
    } else {
        not_found("Product not found")
    }
}

async fn get_cart(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    Json(state.cart_json()).into_response()
}

async fn add_cart_item(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let product_id = body["product_id"].as_i64().unwrap_or_default();
    let quantity = body["quantity"].as_i64().unwrap_or_default();
    if quantity <= 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Input should be greater than 0"}]})),
        )
            .into_response();
    }
    {
        let mut cart = state.cart.lock().unwrap();
        if let Some(row) = cart.values_mut().find(|row| row.product_id == product_id) {
            row.quantity += quantity;
        } else {
            let id = state.next_id();
            cart.insert(
                id,
                CartRow {
                    product_id,
                    quantity,
                },
            );
        }
    }
    (StatusCode::CREATED, Json(state.cart_json())).into_response()
}

async fn update_cart_item(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    state.hit(format!("PATCH /cart/items/{id}"));
    let delay = *state.patch_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let quantity = body["quantity"].as_i64().unwrap_or_default();
    {
        let mut cart = state.cart.lock().unwrap();
        if !cart.contains_key(&id) {
            return not_found("Cart item not found");
        }
        if quantity == 0 {
            cart.remove(&id);
        } else if let Some(row) = cart.get_mut(&id) {
            row.quantity = quantity;
        }
    }
    Json(state.cart_json()).into_response()
}

async fn delete_cart_item(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    state.hit(format!("DELETE /cart/items/{id}"));
    {
        let mut cart = state.cart.lock().unwrap();
        if cart.remove(&id).is_none() {
            return not_found("Cart item not found");
        }
    }
    Json(state.cart_json()).into_response()
}

async fn list_reviews(
    State(state): State<Arc<ServerState>>,
    Path(product_id): Path<i64>,
) -> Response {
    let reviews = state.reviews.lock().unwrap();
    let mut rows: Vec<&ReviewRow> = reviews
        .iter()
        .filter(|row| row.product_id == product_id)
        .collect();
    // newest first
    rows.sort_by_key(|row| std::cmp::Reverse(row.id));
    Json(rows.into_iter().map(review_json).collect::<Vec<_>>()).into_response()
}

async fn create_review(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(product_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let comment = body["comment"].as_str().unwrap_or_default().to_owned();
    let rating = body["rating"].as_i64().unwrap_or_default();
    if comment.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Value error, Comment cannot be empty"}]})),
        )
            .into_response();
    }
    let mut reviews = state.reviews.lock().unwrap();
    if reviews
        .iter()
        .any(|row| row.product_id == product_id && row.user_id == USER_ID)
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "You have already reviewed this product"})),
        )
            .into_response();
    }
    let row = ReviewRow {
        id: state.next_id(),
        product_id,
        user_id: USER_ID,
        user_name: "Ada".to_owned(),
        rating,
        comment,
    };
    let response = review_json(&row);
    reviews.push(row);
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn update_review(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let comment = body["comment"].as_str().unwrap_or_default().to_owned();
    if comment.len() > 50 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"msg": "Value error, Comment too long"}]})),
        )
            .into_response();
    }
    let mut reviews = state.reviews.lock().unwrap();
    let Some(row) = reviews.iter_mut().find(|row| row.id == id) else {
        return not_found("Review not found");
    };
    row.comment = comment;
    if let Some(rating) = body["rating"].as_i64() {
        row.rating = rating;
    }
    Json(review_json(row)).into_response()
}

async fn delete_review(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let mut reviews = state.reviews.lock().unwrap();
    let before = reviews.len();
    reviews.retain(|row| row.id != id);
    if reviews.len() == before {
        return not_found("Review not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn create_order(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    *state.last_order_request.lock().unwrap() = Some(body.clone());
    if body["payment"]["cardholder_name"].as_str() == Some("DECLINED") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid card information"})),
        )
            .into_response();
    }
    let lines: Vec<(i64, CartRow)> = {
        let cart = state.cart.lock().unwrap();
        cart.iter().map(|(id, row)| (*id, row.clone())).collect()
    };
    if lines.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Cart is empty"})),
        )
            .into_response();
    }

    let mut items = Vec::new();
    let mut total_amount = 0.0;
    for (_, row) in &lines {
        let unit_price = price(row.product_id);
        let subtotal = row.quantity as f64 * unit_price;
        total_amount += subtotal;
        items.push(json!({
            "id": state.next_id(),
            "product": product_json(row.product_id),
            "quantity": row.quantity,
            "unit_price": unit_price,
            "subtotal": subtotal,
        }));
    }

    let order = json!({
        "id": state.next_id(),
        "status": "CONFIRMED",
        "payment_status": "PAID",
        "total_amount": total_amount,
        "shipping_customer_name": body["shipping_customer_name"],
        "shipping_address": body["shipping_address"],
        "shipping_phone": body["shipping_phone"],
        "shipping_email": body["shipping_email"],
        "created_at": CREATED_AT,
        "updated_at": CREATED_AT,
        "items": items,
    });

    state.cart.lock().unwrap().clear();
    state.orders.lock().unwrap().push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

async fn list_orders(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let orders = state.orders.lock().unwrap();
    let summaries: Vec<Value> = orders
        .iter()
        .map(|order| {
            let mut summary = order.clone();
            if let Some(object) = summary.as_object_mut() {
                object.remove("items");
                object.remove("updated_at");
            }
            summary
        })
        .collect();
    Json(summaries).into_response()
}

async fn get_order(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !authed(&headers) {
        return unauthorized();
    }
    let orders = state.orders.lock().unwrap();
    orders
        .iter()
        .find(|order| order["id"].as_i64() == Some(id))
        .map_or_else(
            || not_found("Order not found"),
            |order| Json(order.clone()).into_response(),
        )
}
