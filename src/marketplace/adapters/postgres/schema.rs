//! Diesel schema for marketplace persistence.

diesel::table! {
    /// Agent ledger entries keyed by primary address.
    agents (address) {
        /// Primary blockchain address.
        #[max_length = 128]
        address -> Varchar,
        /// Optional display name.
        display_name -> Nullable<Text>,
        /// Optional secondary address.
        #[max_length = 128]
        secondary_address -> Nullable<Varchar>,
        /// Reputation score.
        reputation -> Int8,
        /// Tasks posted.
        tasks_posted -> Int8,
        /// Tasks completed as worker.
        tasks_completed -> Int8,
        /// Sats earned from approved work.
        total_earned_sats -> Int8,
        /// Sats committed to posted tasks.
        total_spent_sats -> Int8,
        /// First reference timestamp.
        first_seen -> Timestamptz,
    }
}

diesel::table! {
    /// Marketplace tasks.
    tasks (id) {
        /// Store-assigned task identifier.
        id -> Int8,
        /// Poster address.
        #[max_length = 128]
        poster -> Varchar,
        /// Task title.
        title -> Text,
        /// Task description.
        description -> Text,
        /// Bounty in sats.
        bounty_sats -> Int8,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Normalized tags.
        tags -> Array<Text>,
        /// Optional deadline.
        deadline -> Nullable<Timestamptz>,
        /// Assigned worker address.
        #[max_length = 128]
        worker -> Nullable<Varchar>,
        /// Submitted proof URL.
        proof_url -> Nullable<Text>,
        /// Submitted proof description.
        proof_description -> Nullable<Text>,
        /// Caller-supplied payment reference.
        #[max_length = 255]
        payment_tx -> Nullable<Varchar>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Bids placed on tasks.
    bids (id) {
        /// Store-assigned bid identifier.
        id -> Int8,
        /// Owning task.
        task_id -> Int8,
        /// Bidder address.
        #[max_length = 128]
        bidder -> Varchar,
        /// Offered amount in sats.
        amount_sats -> Int8,
        /// Optional message.
        message -> Nullable<Text>,
        /// Bid status.
        #[max_length = 20]
        status -> Varchar,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only task activity log.
    task_activity (id) {
        /// Insertion-ordered identifier.
        id -> Int8,
        /// Owning task.
        task_id -> Int8,
        /// Acting agent.
        #[max_length = 128]
        actor -> Varchar,
        /// Action label.
        #[max_length = 32]
        action -> Varchar,
        /// Free-text details.
        details -> Text,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(bids -> tasks (task_id));
diesel::joinable!(task_activity -> tasks (task_id));
diesel::allow_tables_to_appear_in_same_query!(agents, tasks, bids, task_activity);
