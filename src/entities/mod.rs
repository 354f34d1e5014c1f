//! Marketplace entities
pub mod banner;
pub mod category;
pub mod conversation;
pub mod message;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod product_image;
pub mod product_variant;
pub mod review;
pub mod user;
pub mod vendor;

pub use banner::{BannerPosition, Entity as Banner, Model as BannerModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use conversation::{Entity as Conversation, Model as ConversationModel};
pub use message::{Entity as Message, Model as MessageModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use payment::{Entity as Payment, Model as PaymentModel, PaymentStatus};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_variant::{Entity as ProductVariant, Model as ProductVariantModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use user::{Entity as User, Model as UserModel, Role};
pub use vendor::{Entity as Vendor, Model as VendorModel, VendorStatus};
