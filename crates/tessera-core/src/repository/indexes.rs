//! Index Bootstrap
//!
//! Creates the unique and query indexes the engine's invariants rely on.
//! Run once at startup; index creation is idempotent.

use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::domain::{TicketStatus, TicketType};
use crate::error::Result;

/// The storage layer, not the application, enforces "at most one active
/// registration ticket per (event, user)": the partial unique index below
/// rejects the second insert in a race. Merchandise orders are exempt —
/// several orders per user are legal up to the purchase limit.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let tickets = db.collection::<Document>("tickets");

    tickets
        .create_index(
            IndexModel::builder()
                .keys(doc! { "eventId": 1, "userId": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! {
                            "ticketType": TicketType::Registration.as_str(),
                            "status": { "$in": [
                                TicketStatus::PendingApproval.as_str(),
                                TicketStatus::Confirmed.as_str(),
                                TicketStatus::Rejected.as_str(),
                            ] },
                        })
                        .build(),
                )
                .build(),
        )
        .await?;

    tickets
        .create_index(
            IndexModel::builder()
                .keys(doc! { "ticketCode": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    tickets
        .create_index(
            IndexModel::builder()
                .keys(doc! { "userId": 1, "createdAt": -1 })
                .build(),
        )
        .await?;

    let teams = db.collection::<Document>("teams");

    teams
        .create_index(
            IndexModel::builder()
                .keys(doc! { "inviteCode": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    teams
        .create_index(
            IndexModel::builder()
                .keys(doc! { "eventId": 1, "memberIds": 1 })
                .build(),
        )
        .await?;

    let events = db.collection::<Document>("events");

    events
        .create_index(
            IndexModel::builder()
                .keys(doc! { "organizerId": 1 })
                .build(),
        )
        .await?;

    Ok(())
}
