//! Batch lookups used to fill related entities into responses.

use crate::database::MongoDB;
use crate::models::{Appointment, Case, CaseReference, Document, UserSummary};
use crate::utils::AppError;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use std::collections::{HashMap, HashSet};

fn unique(ids: impl IntoIterator<Item = ObjectId>) -> Vec<ObjectId> {
    ids.into_iter().collect::<HashSet<_>>().into_iter().collect()
}

pub async fn user_summaries(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<HashMap<ObjectId, UserSummary>, AppError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<_> = db
        .users()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(users
        .iter()
        .filter_map(|user| user.id.map(|id| (id, UserSummary::from(user))))
        .collect())
}

pub async fn documents(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<HashMap<ObjectId, Document>, AppError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found: Vec<Document> = db
        .documents()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(found.into_iter().filter_map(|d| d.id.map(|id| (id, d))).collect())
}

pub async fn appointments(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<HashMap<ObjectId, Appointment>, AppError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found: Vec<Appointment> = db
        .appointments()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(found.into_iter().filter_map(|a| a.id.map(|id| (id, a))).collect())
}

pub async fn case_references(
    db: &MongoDB,
    ids: impl IntoIterator<Item = ObjectId>,
) -> Result<HashMap<ObjectId, CaseReference>, AppError> {
    let ids = unique(ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let found: Vec<Case> = db
        .cases()
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect()
        .await?;

    Ok(found
        .into_iter()
        .filter_map(|case| {
            case.id.map(|id| {
                (
                    id,
                    CaseReference {
                        id: id.to_hex(),
                        title: case.title,
                    },
                )
            })
        })
        .collect())
}
