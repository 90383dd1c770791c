//! Checkout Orchestrator.
//!
//! Walks a customer through `Details -> Payment -> Success`:
//!
//! - **Details** collects contact and address fields. A complete postal code
//!   triggers an address lookup, then a shipping quote for the resolved
//!   state. Advancing requires every required field and, for carts with
//!   physical books, a selected delivery method.
//! - **Payment** submits the order: it is written to the ledger with status
//!   `Aguardando`, the webhook notification is queued, and a payment
//!   preference is created. The customer then leaves for the gateway.
//! - **Success** is only reached through the gateway's return trip. It never
//!   changes the order status; that belongs to the payment notification
//!   handler.
//!
//! [`CheckoutState`] is plain data kept in the session. [`Checkout`] holds the
//! collaborators and performs the transitions.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rhema_core::order::DEFAULT_PAYMENT_METHOD;
use rhema_core::{
    Address, BookId, CartItem, Money, NewOrder, OrderId, OrderItem, OrderStatus, PostalCode,
    ShippingOption, ShippingOptionId, UserId, format_postal_code_input, has_physical_items,
    total_price,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::address::{AddressResolver, Resolution};
use super::notify::{OrderNotification, OrderNotifier, OrderWebhookPayload};
use super::orders::OrderLedger;
use super::payment::{PaymentError, PaymentGateway, PaymentRedirect};
use super::settings::SettingsCache;
use super::shipping::{ShippingQuoter, digital_option};
use crate::db::RepositoryError;

/// Errors from checkout transitions.
///
/// The `Display` text is meant for the customer.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Required data missing. Carries the single consolidated message.
    #[error("{0}")]
    Validation(String),

    /// Nothing to buy.
    #[error("your cart is empty")]
    EmptyCart,

    /// Action not allowed in the current step.
    #[error("this action is not available during the {0} step")]
    InvalidStep(CheckoutStep),

    /// Selected shipping option is not on offer.
    #[error("unknown shipping option")]
    UnknownShippingOption,

    /// A submission for this checkout is already running.
    #[error("your order is already being submitted")]
    SubmissionInFlight,

    /// Order could not be written to the ledger.
    #[error("could not save your order, please try again")]
    Ledger(#[source] RepositoryError),

    /// Payment handoff failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Checkout steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Details,
    Payment,
    Success,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Details => "details",
            Self::Payment => "payment",
            Self::Success => "success",
        })
    }
}

/// What is being bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutSource {
    /// The customer's cart, read at each step.
    Cart,
    /// "Buy now": one unit of a single book.
    Book(BookId),
}

/// Status reported by the payment gateway on the return trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentReturnStatus {
    Success,
    Failure,
    Pending,
}

/// Contact fields of the details form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
}

/// Partial edit of the details form. The postal code has its own operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailsUpdate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// In-progress checkout, stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub id: Uuid,
    pub source: CheckoutSource,
    pub step: CheckoutStep,
    pub contact: ContactDetails,
    pub address: Address,
    pub shipping_options: Vec<ShippingOption>,
    pub selected_shipping: Option<ShippingOptionId>,
    /// Last message for the customer (lookup result, payment error, ...).
    pub notice: Option<String>,
    /// Most recent order written by this checkout.
    pub last_order_id: Option<OrderId>,
}

impl CheckoutState {
    #[must_use]
    pub fn new(source: CheckoutSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            step: CheckoutStep::Details,
            contact: ContactDetails::default(),
            address: Address::default(),
            shipping_options: Vec::new(),
            selected_shipping: None,
            notice: None,
            last_order_id: None,
        }
    }

    fn ensure_step(&self, step: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step == step {
            Ok(())
        } else {
            Err(CheckoutError::InvalidStep(self.step))
        }
    }

    /// The selected option, if it is still on offer.
    #[must_use]
    pub fn selected_option(&self) -> Option<&ShippingOption> {
        let selected = self.selected_shipping?;
        self.shipping_options.iter().find(|o| o.id == selected)
    }

    /// Price of the selected option, zero when none.
    #[must_use]
    pub fn shipping_cost(&self) -> Money {
        self.selected_option().map_or(Money::ZERO, |o| o.price)
    }

    /// Replace any selection with the free digital option when `items` has
    /// nothing to ship.
    fn settle_digital_shipping(&mut self, items: &[CartItem]) {
        if has_physical_items(items) {
            return;
        }
        let option = digital_option();
        self.selected_shipping = Some(option.id);
        self.shipping_options = vec![option];
    }

    fn clear_shipping(&mut self) {
        self.shipping_options.clear();
        self.selected_shipping = None;
    }

    /// Apply a form edit. Returns whether the state code changed.
    fn apply_update(&mut self, update: DetailsUpdate) -> bool {
        fn set(field: &mut String, value: Option<String>) {
            if let Some(value) = value {
                *field = value;
            }
        }

        let previous_region = self.address.region.trim().to_uppercase();
        set(&mut self.contact.email, update.email);
        set(&mut self.contact.phone, update.phone);
        set(&mut self.contact.first_name, update.first_name);
        set(&mut self.contact.last_name, update.last_name);
        set(&mut self.address.street, update.street);
        set(&mut self.address.number, update.number);
        set(&mut self.address.complement, update.complement);
        set(&mut self.address.neighborhood, update.neighborhood);
        set(&mut self.address.city, update.city);
        set(&mut self.address.region, update.region);
        previous_region != self.address.region.trim().to_uppercase()
    }

    /// Check everything needed to leave the details step.
    ///
    /// # Errors
    ///
    /// Returns one `CheckoutError::Validation` naming every missing field, or
    /// the missing delivery method, or `EmptyCart`.
    pub fn validate_details(&self, items: &[CartItem]) -> Result<(), CheckoutError> {
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let required = [
            ("email", &self.contact.email),
            ("phone", &self.contact.phone),
            ("first name", &self.contact.first_name),
            ("last name", &self.contact.last_name),
            ("postal code", &self.address.postal_code),
            ("street", &self.address.street),
            ("number", &self.address.number),
            ("neighborhood", &self.address.neighborhood),
            ("city", &self.address.city),
            ("state", &self.address.region),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(CheckoutError::Validation(format!(
                "Please fill in all required fields: {}.",
                missing.join(", ")
            )));
        }

        if has_physical_items(items)
            && !self
                .selected_option()
                .is_some_and(|o| o.id != ShippingOptionId::Digital)
        {
            return Err(CheckoutError::Validation(
                "Please wait for the shipping calculation or choose a delivery method.".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the order for the current form and `items`.
    ///
    /// The items are copied, so later cart changes do not touch the order.
    /// Orders without physical items always ship digitally for free,
    /// whatever was selected before.
    #[must_use]
    pub fn compose_order(
        &self,
        id: OrderId,
        user_id: Option<UserId>,
        items: &[CartItem],
    ) -> NewOrder {
        let delivery = if has_physical_items(items) {
            self.selected_option().cloned()
        } else {
            Some(digital_option())
        };
        let shipping_cost = delivery.as_ref().map_or(Money::ZERO, |o| o.price);
        NewOrder {
            id,
            user_id,
            customer_name: format!(
                "{} {}",
                self.contact.first_name.trim(),
                self.contact.last_name.trim()
            ),
            customer_email: self.contact.email.trim().to_string(),
            customer_phone: self.contact.phone.trim().to_string(),
            address: self.address.line(),
            city: self.address.city_line(),
            zip: self.address.postal_code.clone(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            status: OrderStatus::Awaiting,
            amount: total_price(items) + shipping_cost,
            shipping_cost: Some(shipping_cost),
            shipping_method: delivery.map(|o| o.name),
            items: items
                .iter()
                .map(|item| OrderItem {
                    book_id: Some(item.book_id),
                    title: item.title.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }

    /// Leave `Payment` for `Details`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStep` outside the payment step.
    pub fn back_to_details(&mut self) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Payment)?;
        self.step = CheckoutStep::Details;
        self.notice = None;
        Ok(())
    }

    /// Choose a delivery method from the offered options.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShippingOption` if `id` is not on offer.
    pub fn select_shipping(&mut self, id: ShippingOptionId) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Details)?;
        if !self.shipping_options.iter().any(|o| o.id == id) {
            return Err(CheckoutError::UnknownShippingOption);
        }
        self.selected_shipping = Some(id);
        Ok(())
    }

    /// Try to advance `Details -> Payment`.
    ///
    /// All-digital carts need no selection: the free digital option replaces
    /// whatever was chosen. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// Returns the validation error; the step stays `Details`.
    pub fn continue_to_payment(&mut self, items: &[CartItem]) -> Result<(), CheckoutError> {
        self.ensure_step(CheckoutStep::Details)?;
        self.validate_details(items)?;
        self.settle_digital_shipping(items);
        self.step = CheckoutStep::Payment;
        self.notice = None;
        Ok(())
    }

    /// Handle the customer coming back from the gateway.
    ///
    /// Returns `true` when the checkout moved to `Success`.
    pub fn complete_return(&mut self, status: PaymentReturnStatus) -> bool {
        if self.step != CheckoutStep::Payment {
            return false;
        }
        match status {
            PaymentReturnStatus::Success => {
                self.step = CheckoutStep::Success;
                self.notice = None;
                true
            }
            PaymentReturnStatus::Pending => {
                self.notice = Some(
                    "Your payment is pending confirmation. We will email you once it clears."
                        .to_string(),
                );
                false
            }
            PaymentReturnStatus::Failure => {
                self.notice =
                    Some("The payment was not completed. You can try again.".to_string());
                false
            }
        }
    }
}

/// Checkout state plus the derived totals, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    #[serde(flatten)]
    pub state: CheckoutState,
    pub items: Vec<CartItem>,
    pub has_physical_items: bool,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub submitting: bool,
}

/// Drops the in-flight marker when the submission ends.
struct SubmissionGuard {
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// The checkout collaborators.
#[derive(Clone)]
pub struct Checkout {
    resolver: AddressResolver,
    quoter: ShippingQuoter,
    ledger: Arc<dyn OrderLedger>,
    payments: Arc<dyn PaymentGateway>,
    notifier: OrderNotifier,
    settings: SettingsCache,
    return_url: String,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl Checkout {
    #[must_use]
    pub fn new(
        resolver: AddressResolver,
        quoter: ShippingQuoter,
        ledger: Arc<dyn OrderLedger>,
        payments: Arc<dyn PaymentGateway>,
        notifier: OrderNotifier,
        settings: SettingsCache,
        return_url: String,
    ) -> Self {
        Self {
            resolver,
            quoter,
            ledger,
            payments,
            notifier,
            settings,
            return_url,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a submission for this checkout is running.
    #[must_use]
    pub fn is_submitting(&self, state: &CheckoutState) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&state.id)
    }

    #[must_use]
    pub fn view(&self, state: &CheckoutState, items: &[CartItem]) -> CheckoutView {
        let subtotal = total_price(items);
        let shipping_cost = state.shipping_cost();
        CheckoutView {
            state: state.clone(),
            items: items.to_vec(),
            has_physical_items: has_physical_items(items),
            subtotal,
            shipping_cost,
            total: subtotal + shipping_cost,
            submitting: self.is_submitting(state),
        }
    }

    /// Edit the details form. A changed state code re-quotes shipping.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStep` outside the details step.
    #[instrument(skip_all, fields(checkout_id = %state.id))]
    pub async fn update_details(
        &self,
        state: &mut CheckoutState,
        update: DetailsUpdate,
        items: &[CartItem],
    ) -> Result<(), CheckoutError> {
        state.ensure_step(CheckoutStep::Details)?;
        if state.apply_update(update) {
            state.clear_shipping();
            if !state.address.region.trim().is_empty() {
                self.requote(state, items).await;
            }
        }
        Ok(())
    }

    /// Handle postal code input.
    ///
    /// The input is normalised and stored. Once it has eight digits, previous
    /// shipping options are cleared and the address is looked up. A found
    /// address fills street, neighborhood, city and state and triggers a
    /// shipping quote. Otherwise the form is left alone and a notice is set.
    /// Returns `None` while the code is incomplete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStep` outside the details step.
    #[instrument(skip_all, fields(checkout_id = %state.id))]
    pub async fn enter_postal_code(
        &self,
        state: &mut CheckoutState,
        input: &str,
        items: &[CartItem],
    ) -> Result<Option<Resolution>, CheckoutError> {
        state.ensure_step(CheckoutStep::Details)?;
        let formatted = format_postal_code_input(input);
        state.address.postal_code.clone_from(&formatted);
        if PostalCode::parse(&formatted).is_err() {
            return Ok(None);
        }

        state.clear_shipping();
        state.notice = None;

        let resolution = self.resolver.resolve(&formatted).await;
        match &resolution {
            Resolution::Found(resolved) => {
                state.address.apply_resolved(resolved);
                self.requote(state, items).await;
            }
            Resolution::NotFound => {
                state.notice =
                    Some("Postal code not found. Please check the digits entered.".to_string());
            }
            Resolution::Unavailable => {
                state.notice = Some(
                    "We could not look up this postal code. Please fill in the address manually."
                        .to_string(),
                );
            }
        }
        Ok(Some(resolution))
    }

    async fn requote(&self, state: &mut CheckoutState, items: &[CartItem]) {
        match self
            .quoter
            .quote(&state.address.region, has_physical_items(items))
            .await
        {
            Ok(quote) => {
                state.shipping_options = quote.options;
                state.selected_shipping = quote.selected;
            }
            Err(error) => {
                warn!(error = %error, region = %state.address.region, "Shipping quote failed");
                state.clear_shipping();
                state.notice =
                    Some("We could not calculate shipping right now. Please try again.".to_string());
            }
        }
    }

    /// Submit the order and obtain the payment redirect.
    ///
    /// Only one submission per checkout runs at a time. Any failure leaves the
    /// checkout in `Payment` with the error message as notice, ready to retry.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionInFlight`, a validation error, a ledger error or a
    /// payment error.
    #[instrument(skip_all, fields(checkout_id = %state.id))]
    pub async fn submit(
        &self,
        state: &mut CheckoutState,
        items: &[CartItem],
        user_id: Option<UserId>,
    ) -> Result<PaymentRedirect, CheckoutError> {
        state.ensure_step(CheckoutStep::Payment)?;
        let _guard = self.begin_submission(state.id)?;

        let result = self.place_order(state, items, user_id).await;
        state.notice = result.as_ref().err().map(ToString::to_string);
        result
    }

    fn begin_submission(&self, id: Uuid) -> Result<SubmissionGuard, CheckoutError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id) {
            return Err(CheckoutError::SubmissionInFlight);
        }
        Ok(SubmissionGuard {
            in_flight: Arc::clone(&self.in_flight),
            id,
        })
    }

    async fn place_order(
        &self,
        state: &mut CheckoutState,
        items: &[CartItem],
        user_id: Option<UserId>,
    ) -> Result<PaymentRedirect, CheckoutError> {
        state.validate_details(items)?;
        state.settle_digital_shipping(items);

        let order = state.compose_order(OrderId::generate(), user_id, items);
        let created_at = self
            .ledger
            .create_order(&order)
            .await
            .map_err(CheckoutError::Ledger)?;
        state.last_order_id = Some(order.id);
        info!(order_id = %order.id, amount = %order.amount, "Order created");

        self.queue_notification(&order, created_at).await;

        let redirect = self
            .payments
            .create_preference(&order, &self.return_url)
            .await?;
        Ok(redirect)
    }

    async fn queue_notification(&self, order: &NewOrder, created_at: chrono::DateTime<Utc>) {
        let settings = match self.settings.get().await {
            Ok(settings) => settings,
            Err(error) => {
                warn!(error = %error, "Skipping order notification, settings unavailable");
                return;
            }
        };
        let Some(url) = settings.order_webhook_url() else {
            return;
        };
        self.notifier.notify(OrderNotification {
            url: url.to_string(),
            payload: OrderWebhookPayload::from_order(order, created_at),
        });
    }
}
