use chrono::NaiveDate;
use fulfillment_engine::{
    db_types::{
        Cancellation,
        DeliveryPartnerOrder,
        DeliverySlot,
        FulfillmentStatus,
        NewDeliverySlot,
        NewOrder,
        NewPayoutRequest,
        NewProduct,
        NewSector,
        Order,
        OrderItem,
        OrderPickup,
        PayoutRequest,
        PayoutSettings,
        Product,
        Sector,
        SectorAssignment,
        VendorSettings,
        VendorWallet,
    },
    traits::{
        AssignmentManagement,
        CancelOutcome,
        CatalogManagement,
        FulfillmentDatabase,
        FulfillmentError,
        ItemUpdated,
        ItemsUpdated,
        OrderManagement,
        PayoutQueryFilter,
        PendingConfirmation,
        SlotManagement,
        WalletManagement,
    },
};
use mockall::mock;

mock! {
    pub WalletManager {}
    impl WalletManagement for WalletManager {
        async fn sync_wallet(&self, vendor_id: i64) -> Result<VendorWallet, FulfillmentError>;
        async fn fetch_wallet(&self, vendor_id: i64) -> Result<Option<VendorWallet>, FulfillmentError>;
        async fn update_payout_settings(&self, vendor_id: i64, settings: PayoutSettings) -> Result<VendorWallet, FulfillmentError>;
        async fn insert_payout_request(&self, request: NewPayoutRequest) -> Result<PayoutRequest, FulfillmentError>;
        async fn fetch_payout(&self, payout_id: i64) -> Result<Option<PayoutRequest>, FulfillmentError>;
        async fn search_payouts(&self, filter: PayoutQueryFilter) -> Result<Vec<PayoutRequest>, FulfillmentError>;
        async fn approve_payout(&self, payout_id: i64, approved_by: i64) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;
        async fn cancel_payout(&self, payout_id: i64, decided_by: Option<i64>, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError>;
        async fn complete_payout(&self, payout_id: i64, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError>;
        async fn fail_payout(&self, payout_id: i64, notes: Option<String>) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;
    }
}

mock! {
    pub SlotManager {}
    impl SlotManagement for SlotManager {
        async fn fetch_slot(&self, slot_id: i64) -> Result<Option<DeliverySlot>, FulfillmentError>;
        async fn fetch_slots_for_sector(&self, sector_id: i64, date: NaiveDate) -> Result<Vec<DeliverySlot>, FulfillmentError>;
        async fn reserve_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;
        async fn release_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;
        async fn sector_serves_postal_code(&self, sector_id: i64, postal_code: &str) -> Result<bool, FulfillmentError>;
    }
}

mock! {
    pub Database {}
    impl Clone for Database {
        fn clone(&self) -> Self;
    }
    impl FulfillmentDatabase for Database {
        fn url(&self) -> &str;
        async fn close(&mut self) -> Result<(), FulfillmentError>;
    }
    impl CatalogManagement for Database {
        async fn create_sector(&self, sector: NewSector) -> Result<Sector, FulfillmentError>;
        async fn fetch_sector(&self, sector_id: i64) -> Result<Option<Sector>, FulfillmentError>;
        async fn create_slot(&self, slot: NewDeliverySlot) -> Result<DeliverySlot, FulfillmentError>;
        async fn create_slots_for_dates(&self, template: NewDeliverySlot, dates: &[NaiveDate]) -> Result<Vec<DeliverySlot>, FulfillmentError>;
        async fn create_product(&self, product: NewProduct) -> Result<Product, FulfillmentError>;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, FulfillmentError>;
        async fn upsert_vendor_settings(&self, settings: VendorSettings) -> Result<VendorSettings, FulfillmentError>;
        async fn fetch_vendor_settings(&self, vendor_id: i64) -> Result<Option<VendorSettings>, FulfillmentError>;
    }
    impl SlotManagement for Database {
        async fn fetch_slot(&self, slot_id: i64) -> Result<Option<DeliverySlot>, FulfillmentError>;
        async fn fetch_slots_for_sector(&self, sector_id: i64, date: NaiveDate) -> Result<Vec<DeliverySlot>, FulfillmentError>;
        async fn reserve_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;
        async fn release_slot(&self, slot_id: i64) -> Result<DeliverySlot, FulfillmentError>;
        async fn sector_serves_postal_code(&self, sector_id: i64, postal_code: &str) -> Result<bool, FulfillmentError>;
    }
    impl OrderManagement for Database {
        async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), FulfillmentError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, FulfillmentError>;
        async fn fetch_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError>;
        async fn fetch_orders_for_sector_date(&self, sector_id: i64, date: NaiveDate) -> Result<Vec<Order>, FulfillmentError>;
        async fn transition_item(&self, item_id: i64, from: FulfillmentStatus, to: FulfillmentStatus) -> Result<ItemUpdated, FulfillmentError>;
        async fn transition_order_items(&self, order_id: i64, from: FulfillmentStatus, to: FulfillmentStatus) -> Result<ItemsUpdated, FulfillmentError>;
        async fn cancel_item(&self, item_id: i64, from: FulfillmentStatus, cancellation: Cancellation) -> Result<CancelOutcome, FulfillmentError>;
        async fn consume_pickup_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError>;
        async fn consume_delivery_otp(&self, order_id: i64, otp: &str) -> Result<ItemsUpdated, FulfillmentError>;
        async fn fetch_unconfirmed_items(&self) -> Result<Vec<PendingConfirmation>, FulfillmentError>;
        async fn auto_confirm_item(&self, item_id: i64) -> Result<ItemUpdated, FulfillmentError>;
        async fn escalate_item(&self, item_id: i64) -> Result<Option<OrderItem>, FulfillmentError>;
        async fn update_vendor_notes(&self, item_id: i64, notes: &str) -> Result<OrderItem, FulfillmentError>;
    }
    impl AssignmentManagement for Database {
        async fn ensure_assignment(&self, order_id: i64, partner_id: i64) -> Result<(DeliveryPartnerOrder, bool), FulfillmentError>;
        async fn ensure_pickup_records(&self, order_id: i64, partner_id: i64) -> Result<(Vec<OrderPickup>, usize), FulfillmentError>;
        async fn assign_delivery(&self, order_id: i64, partner_id: i64) -> Result<(DeliveryPartnerOrder, Vec<OrderPickup>), FulfillmentError>;
        async fn fetch_assignment_for_order(&self, order_id: i64) -> Result<Option<DeliveryPartnerOrder>, FulfillmentError>;
        async fn fetch_pickups_for_order(&self, order_id: i64) -> Result<Vec<OrderPickup>, FulfillmentError>;
        async fn upsert_sector_assignment(&self, sector_id: i64, partner_id: i64, date: NaiveDate) -> Result<SectorAssignment, FulfillmentError>;
        async fn fetch_sector_assignments(&self, date: NaiveDate) -> Result<Vec<SectorAssignment>, FulfillmentError>;
    }
    impl WalletManagement for Database {
        async fn sync_wallet(&self, vendor_id: i64) -> Result<VendorWallet, FulfillmentError>;
        async fn fetch_wallet(&self, vendor_id: i64) -> Result<Option<VendorWallet>, FulfillmentError>;
        async fn update_payout_settings(&self, vendor_id: i64, settings: PayoutSettings) -> Result<VendorWallet, FulfillmentError>;
        async fn insert_payout_request(&self, request: NewPayoutRequest) -> Result<PayoutRequest, FulfillmentError>;
        async fn fetch_payout(&self, payout_id: i64) -> Result<Option<PayoutRequest>, FulfillmentError>;
        async fn search_payouts(&self, filter: PayoutQueryFilter) -> Result<Vec<PayoutRequest>, FulfillmentError>;
        async fn approve_payout(&self, payout_id: i64, approved_by: i64) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;
        async fn cancel_payout(&self, payout_id: i64, decided_by: Option<i64>, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError>;
        async fn complete_payout(&self, payout_id: i64, notes: Option<String>) -> Result<PayoutRequest, FulfillmentError>;
        async fn fail_payout(&self, payout_id: i64, notes: Option<String>) -> Result<(PayoutRequest, VendorWallet), FulfillmentError>;
    }
}
