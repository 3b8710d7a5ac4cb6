//! Built-in template catalog seeded into the in-memory store

use super::types::NotificationTemplate;

const ADMINS: [&str; 2] = ["admin", "business_admin"];

pub fn default_templates() -> Vec<NotificationTemplate> {
    vec![
        NotificationTemplate::new(
            "welcome_user",
            "Welcome to vipogroup",
            "Welcome to vipogroup! Your registration is complete. Enjoy group purchases, smart prices and unique opportunities.",
        )
        .with_audience(["customer", "agent"])
        .with_description("Welcome message after a customer or agent signs up."),
        NotificationTemplate::new(
            "admin_new_registration",
            "New registration",
            "A new user joined vipogroup. User type: {{user_type}}. Date and time: {{datetime}}.",
        )
        .with_audience(ADMINS)
        .with_variables(["user_type", "datetime"])
        .with_description("Tells admins about a new user."),
        NotificationTemplate::new(
            "order_confirmation",
            "Your vipogroup purchase is complete",
            "Thank you for your purchase! Payment was received and the order is in the system. Order details are available in your personal area.",
        )
        .with_audience(["customer"])
        .with_variables(["order_id"])
        .with_description("Purchase confirmation for the customer."),
        NotificationTemplate::new(
            "agent_commission_awarded",
            "You earned a new commission!",
            "A purchase was made through your link or coupon code. Commission credited: {{commission_percent}}%.",
        )
        .with_audience(["agent"])
        .with_variables(["commission_percent"])
        .with_description("Tells an agent about a new commission."),
        NotificationTemplate::new(
            "admin_agent_sale",
            "Purchase through an agent code",
            "A purchase was made with an agent coupon code. The agent is entitled to a commission under the vipogroup policy.",
        )
        .with_audience(ADMINS)
        .with_variables(["agent_name", "order_id"])
        .with_description("Tells admins about a sale made through an agent code."),
        NotificationTemplate::new(
            "admin_payment_completed",
            "New sale paid",
            "A payment completed successfully and the transaction was recorded.",
        )
        .with_audience(ADMINS)
        .with_variables(["order_id", "amount"])
        .with_description("Tells admins a payment completed."),
        NotificationTemplate::new(
            "order_new",
            "New order received",
            "A new order was placed. Customer: {{customer_name}} · Amount: {{total_amount}} ₪ · ID: {{order_id}}.",
        )
        .with_audience(ADMINS)
        .with_variables(["order_id", "customer_name", "total_amount"])
        .with_description("Push to admins when a new order is created."),
        NotificationTemplate::new(
            "agent_daily_digest",
            "Daily report: activity and commissions",
            "Hi {{agent_name}}, here is today's summary. Visits through your link: {{visits}} · Purchases: {{orders}} · Commission earned today: {{commission}} ₪. Keep sharing!",
        )
        .with_audience(["agent"])
        .with_variables(["agent_name", "visits", "orders", "commission"])
        .with_description("Daily digest for agents."),
        NotificationTemplate::new(
            "product_new_release",
            "A new product is live!",
            "A new product was added and is available for purchase now. Come take a look!",
        )
        .with_audience(["customer", "agent"])
        .with_variables(["product_name", "product_url"])
        .with_description("Announces a new product."),
        NotificationTemplate::new(
            "group_buy_weekly_reminder",
            "Reminder: the group purchase is still open",
            "The group purchase you joined is still open. Time left: {{time_left}}. Join now and keep the group price.",
        )
        .with_audience(["customer"])
        .with_variables(["time_left", "group_name"])
        .with_description("Recurring reminder for an open group purchase."),
        NotificationTemplate::new(
            "group_buy_last_call",
            "Last 24 hours for the group purchase",
            "The group purchase closes in 24 hours. This is the last chance to get the group price.",
        )
        .with_audience(["customer"])
        .with_variables(["group_name"])
        .with_description("Reminder 24 hours before closing."),
        NotificationTemplate::new(
            "group_buy_closed",
            "The group purchase has closed",
            "The group purchase closed successfully. Thanks to everyone who took part! New deals are coming soon.",
        )
        .with_audience(["customer"])
        .with_variables(["group_name"])
        .with_description("Group purchase closed."),
        NotificationTemplate::new(
            "withdrawal_approved",
            "Your withdrawal request was approved",
            "Your withdrawal request for {{amount}} ₪ was approved and is being processed.",
        )
        .with_audience(["agent"])
        .with_variables(["amount"])
        .with_description("Withdrawal approved."),
        NotificationTemplate::new(
            "withdrawal_completed",
            "Transfer completed!",
            "The transfer of {{amount}} ₪ was sent to the payment details you provided.",
        )
        .with_audience(["agent"])
        .with_variables(["amount"])
        .with_description("Withdrawal transfer completed."),
        NotificationTemplate::new(
            "withdrawal_rejected",
            "Your withdrawal request was rejected",
            "Your withdrawal request for {{amount}} ₪ was rejected. Reason: {{reason}}. You can submit a new request with updated details.",
        )
        .with_audience(["agent"])
        .with_variables(["amount", "reason"])
        .with_description("Withdrawal rejected."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_types_unique_and_valid() {
        let templates = default_templates();
        let types: HashSet<_> = templates.iter().map(|t| t.template_type.clone()).collect();
        assert_eq!(types.len(), templates.len());
        assert!(templates.iter().all(|t| t.validate().is_ok() && t.enabled));
    }
}
