//! Demo data for local development and the `seed-data` binary.
//!
//! `clear_all` empties every table in dependency order. `seed_demo` inserts a
//! small but complete marketplace: an admin, two approved vendors, two
//! customers, a catalog, banners, one paid order, a review and a conversation.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::hash_password,
    entities::{
        banner, category, conversation, message, order, order_item, payment, product,
        product_image, product_variant, review, user, vendor, BannerPosition, OrderStatus,
        PaymentStatus, Role, VendorStatus,
    },
    errors::ServiceError,
    services::{orders::order_total, slugify},
};

pub const ADMIN_EMAIL: &str = "admin@iwanyu.com";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const VENDOR_PASSWORD: &str = "vendor123";
pub const CUSTOMER_PASSWORD: &str = "customer123";

/// Row counts produced by `seed_demo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub vendors: usize,
    pub categories: usize,
    pub products: usize,
    pub variants: usize,
    pub images: usize,
    pub banners: usize,
    pub orders: usize,
    pub payments: usize,
    pub reviews: usize,
    pub conversations: usize,
    pub messages: usize,
}

/// Demo login, printed by the seed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoAccount {
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub fn demo_accounts() -> Vec<DemoAccount> {
    vec![
        DemoAccount {
            email: ADMIN_EMAIL,
            password: ADMIN_PASSWORD,
            role: Role::Admin,
        },
        DemoAccount {
            email: "vendor1@iwanyu.com",
            password: VENDOR_PASSWORD,
            role: Role::Vendor,
        },
        DemoAccount {
            email: "vendor2@iwanyu.com",
            password: VENDOR_PASSWORD,
            role: Role::Vendor,
        },
        DemoAccount {
            email: "customer1@iwanyu.com",
            password: CUSTOMER_PASSWORD,
            role: Role::Customer,
        },
        DemoAccount {
            email: "customer2@iwanyu.com",
            password: CUSTOMER_PASSWORD,
            role: Role::Customer,
        },
    ]
}

/// Deletes every row, children before parents.
pub async fn clear_all(db: &DatabaseConnection) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    message::Entity::delete_many().exec(&txn).await?;
    conversation::Entity::delete_many().exec(&txn).await?;
    review::Entity::delete_many().exec(&txn).await?;
    payment::Entity::delete_many().exec(&txn).await?;
    order_item::Entity::delete_many().exec(&txn).await?;
    order::Entity::delete_many().exec(&txn).await?;
    product_image::Entity::delete_many().exec(&txn).await?;
    product_variant::Entity::delete_many().exec(&txn).await?;
    product::Entity::delete_many().exec(&txn).await?;
    category::Entity::delete_many().exec(&txn).await?;
    vendor::Entity::delete_many().exec(&txn).await?;
    banner::Entity::delete_many().exec(&txn).await?;
    user::Entity::delete_many().exec(&txn).await?;
    txn.commit().await?;
    info!("All marketplace data cleared");
    Ok(())
}

struct CatalogItem {
    vendor: usize,
    category: &'static str,
    name: &'static str,
    description: &'static str,
    price: Decimal,
    stock: i32,
    tags: &'static str,
    image: &'static str,
    variants: Vec<(&'static str, &'static str, Decimal, i32)>,
}

fn catalog() -> Vec<CatalogItem> {
    vec![
        CatalogItem {
            vendor: 0,
            category: "Electronics",
            name: "Tecno Spark 20 Smartphone",
            description: "6.6\" display, 128GB storage, dual SIM.",
            price: dec!(165000),
            stock: 25,
            tags: "phones,android",
            image: "https://images.iwanyu.com/products/tecno-spark-20.jpg",
            variants: vec![
                ("Color", "Black", dec!(0), 15),
                ("Color", "Gold", dec!(5000), 10),
            ],
        },
        CatalogItem {
            vendor: 0,
            category: "Electronics",
            name: "Solar Power Bank 20000mAh",
            description: "Charges from sunlight or USB, two outputs.",
            price: dec!(28000),
            stock: 40,
            tags: "solar,accessories",
            image: "https://images.iwanyu.com/products/solar-power-bank.jpg",
            variants: vec![],
        },
        CatalogItem {
            vendor: 0,
            category: "Electronics",
            name: "Bluetooth Speaker",
            description: "Portable waterproof speaker with 12h battery.",
            price: dec!(35000),
            stock: 4,
            tags: "audio,accessories",
            image: "https://images.iwanyu.com/products/bluetooth-speaker.jpg",
            variants: vec![],
        },
        CatalogItem {
            vendor: 1,
            category: "Fashion",
            name: "Kitenge Dress",
            description: "Hand-tailored in Kigali from African print fabric.",
            price: dec!(25000),
            stock: 18,
            tags: "kitenge,women",
            image: "https://images.iwanyu.com/products/kitenge-dress.jpg",
            variants: vec![
                ("Size", "M", dec!(0), 8),
                ("Size", "L", dec!(0), 6),
                ("Size", "XL", dec!(2000), 4),
            ],
        },
        CatalogItem {
            vendor: 1,
            category: "Home & Living",
            name: "Agaseke Basket",
            description: "Traditional woven peace basket.",
            price: dec!(12000),
            stock: 30,
            tags: "handmade,decor",
            image: "https://images.iwanyu.com/products/agaseke-basket.jpg",
            variants: vec![],
        },
        CatalogItem {
            vendor: 1,
            category: "Groceries",
            name: "Rwanda Arabica Coffee 500g",
            description: "Single origin, medium roast, whole bean.",
            price: dec!(8500),
            stock: 60,
            tags: "coffee,local",
            image: "https://images.iwanyu.com/products/arabica-coffee.jpg",
            variants: vec![("Grind", "Ground", dec!(500), 20)],
        },
    ]
}

async fn insert_user<C: ConnectionTrait>(
    db: &C,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    phone: Option<&str>,
) -> Result<user::Model, ServiceError> {
    let now = Utc::now();
    Ok(user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        is_active: Set(true),
        email_verified: Set(true),
        phone: Set(phone.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?)
}

/// Populates an empty database. Run `clear_all` first on a used one.
/// The demo order and payment are recorded in `currency`.
pub async fn seed_demo(
    db: &DatabaseConnection,
    currency: &str,
) -> Result<SeedSummary, ServiceError> {
    let currency = currency.trim().to_uppercase();
    let mut summary = SeedSummary::default();
    let now = Utc::now();
    let txn = db.begin().await?;

    let admin = insert_user(&txn, "Iwanyu Admin", ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin, None).await?;
    let vendor_users = [
        insert_user(&txn, "Jean Bosco", "vendor1@iwanyu.com", VENDOR_PASSWORD, Role::Vendor, Some("+250788000001")).await?,
        insert_user(&txn, "Claudine Uwase", "vendor2@iwanyu.com", VENDOR_PASSWORD, Role::Vendor, Some("+250788000002")).await?,
    ];
    let customer1 = insert_user(&txn, "Eric Mugisha", "customer1@iwanyu.com", CUSTOMER_PASSWORD, Role::Customer, Some("+250788000011")).await?;
    let customer2 = insert_user(&txn, "Aline Ingabire", "customer2@iwanyu.com", CUSTOMER_PASSWORD, Role::Customer, None).await?;
    summary.users = 5;

    let shops = [
        ("Kigali Tech Hub", "KN 4 Ave, Kigali", "Phones, solar and gadgets"),
        ("Inzozi Crafts & Fashion", "KG 11 Ave, Kimironko", "Made in Rwanda fashion and crafts"),
    ];
    let mut vendors = Vec::with_capacity(shops.len());
    for (owner, (business_name, address, description)) in vendor_users.iter().zip(shops) {
        let vendor = vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.id),
            business_name: Set(business_name.to_string()),
            description: Set(Some(description.to_string())),
            address: Set(Some(address.to_string())),
            phone: Set(owner.phone.clone()),
            status: Set(VendorStatus::Approved),
            is_verified: Set(true),
            reviewed_by: Set(Some(admin.id)),
            reviewed_at: Set(Some(now)),
            review_note: Set(Some("Documents verified".to_string())),
            created_at: Set(now - Duration::days(30)),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        vendors.push(vendor);
    }
    summary.vendors = vendors.len();

    let mut categories = std::collections::HashMap::new();
    for (name, description) in [
        ("Electronics", "Phones, solar and accessories"),
        ("Fashion", "Clothing and kitenge"),
        ("Home & Living", "Decor and handmade crafts"),
        ("Groceries", "Local food and drinks"),
    ] {
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slugify(name)),
            description: Set(Some(description.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        categories.insert(name, category.id);
    }
    summary.categories = categories.len();

    let mut products = Vec::new();
    for item in catalog() {
        let category_id = categories
            .get(item.category)
            .copied()
            .ok_or_else(|| ServiceError::InternalError(format!("unknown category {}", item.category)))?;
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendors[item.vendor].id),
            category_id: Set(category_id),
            name: Set(item.name.to_string()),
            slug: Set(slugify(item.name)),
            description: Set(Some(item.description.to_string())),
            price: Set(item.price),
            stock: Set(item.stock),
            tags: Set(Some(item.tags.to_string())),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            url: Set(item.image.to_string()),
            alt: Set(Some(item.name.to_string())),
            position: Set(0),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        summary.images += 1;

        for (name, value, price_delta, stock) in &item.variants {
            product_variant::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product.id),
                name: Set(name.to_string()),
                value: Set(value.to_string()),
                price_delta: Set(*price_delta),
                stock: Set(*stock),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            summary.variants += 1;
        }
        products.push(product);
    }
    summary.products = products.len();

    for (title, subtitle, position, sort_order) in [
        ("Shop Made in Rwanda", "Crafts, fashion and coffee from local makers", BannerPosition::Hero, 0),
        ("Solar Week", "Up to 20% off power banks", BannerPosition::Promotional, 0),
        ("Free delivery in Kigali", "On orders above 50,000 RWF", BannerPosition::Secondary, 0),
    ] {
        banner::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            subtitle: Set(Some(subtitle.to_string())),
            image_url: Set(Some(format!("https://images.iwanyu.com/banners/{}.jpg", slugify(title)))),
            link_url: Set(None),
            position: Set(position),
            is_active: Set(true),
            sort_order: Set(sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        summary.banners += 1;
    }

    // customer1 bought the power bank and two bags of coffee; stock reflects the sale
    let bought = [(&products[1], 1), (&products[5], 2)];
    let lines: Vec<(Decimal, i32)> = bought.iter().map(|(p, q)| (p.price, *q)).collect();
    let total = order_total(&lines);
    let placed_at = now - Duration::days(3);
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(customer1.id),
        total: Set(total),
        currency: Set(currency.clone()),
        status: Set(OrderStatus::Paid),
        shipping_address: Set("KG 7 Ave 12, Kacyiru, Kigali".to_string()),
        paid_at: Set(Some(placed_at + Duration::minutes(5))),
        delivered_at: Set(None),
        created_at: Set(placed_at),
        updated_at: Set(placed_at),
    }
    .insert(&txn)
    .await?;
    for (product, quantity) in bought {
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            variant_id: Set(None),
            vendor_id: Set(product.vendor_id),
            product_name: Set(product.name.clone()),
            variant_label: Set(None),
            quantity: Set(quantity),
            price: Set(product.price),
            created_at: Set(placed_at),
        }
        .insert(&txn)
        .await?;
        let mut active: product::ActiveModel = product.clone().into();
        active.stock = Set(product.stock - quantity);
        active.update(&txn).await?;
    }
    summary.orders = 1;

    payment::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        user_id: Set(customer1.id),
        amount: Set(total),
        currency: Set(currency.clone()),
        provider: Set("MTN_MOMO".to_string()),
        transaction_ref: Set("TX-SEED0000001".to_string()),
        status: Set(PaymentStatus::Completed),
        created_at: Set(placed_at + Duration::minutes(5)),
        updated_at: Set(placed_at + Duration::minutes(5)),
    }
    .insert(&txn)
    .await?;
    summary.payments = 1;

    review::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(customer1.id),
        product_id: Set(products[5].id),
        rating: Set(5),
        comment: Set(Some("Best coffee I've had, fast delivery too.".to_string())),
        created_at: Set(now - Duration::days(1)),
    }
    .insert(&txn)
    .await?;
    summary.reviews = 1;

    let thread = conversation::ActiveModel {
        id: Set(Uuid::new_v4()),
        buyer_id: Set(customer2.id),
        seller_id: Set(vendor_users[1].id),
        product_id: Set(products[3].id),
        last_message_at: Set(Some(now - Duration::hours(1))),
        created_at: Set(now - Duration::hours(2)),
    }
    .insert(&txn)
    .await?;
    for (sender, body, sent_at, read) in [
        (customer2.id, "Muraho! Do you have the kitenge dress in size S?", now - Duration::hours(2), true),
        (vendor_users[1].id, "Yego, we can tailor an S in two days.", now - Duration::hours(1), false),
    ] {
        message::ActiveModel {
            id: Set(Uuid::new_v4()),
            conversation_id: Set(thread.id),
            sender_id: Set(sender),
            body: Set(body.to_string()),
            is_read: Set(read),
            read_at: Set(read.then_some(sent_at + Duration::minutes(10))),
            created_at: Set(sent_at),
        }
        .insert(&txn)
        .await?;
        summary.messages += 1;
    }
    summary.conversations = 1;

    txn.commit().await?;
    info!(?summary, "Demo data seeded");
    Ok(summary)
}
