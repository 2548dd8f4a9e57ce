use crate::{
    database::MongoDB,
    models::{
        AddNoteRequest, AppointmentSummary, AuthUser, Case, CaseNote, CaseResponse, CaseStatus,
        CreateCaseRequest, DocumentSummary, NoteResponse, Role, UpdateCaseRequest, UserSummary,
    },
    services::{
        access_policy::{authorize, Action},
        notification_service::{self, Notifier},
        populate,
    },
    utils::{parse_object_id, time::to_chrono, AppError},
};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document};
use mongodb::options::ReturnDocument;
use std::collections::HashMap;
use validator::Validate;

/// Private notes are only shown to the user who wrote them.
fn visible_notes<'a>(case: &'a Case, viewer: &'a ObjectId) -> impl Iterator<Item = &'a CaseNote> {
    case.notes
        .iter()
        .filter(move |note| !note.is_private || &note.created_by == viewer)
}

fn note_response(note: &CaseNote, users: &HashMap<ObjectId, UserSummary>) -> NoteResponse {
    NoteResponse {
        id: note.id.to_hex(),
        content: note.content.clone(),
        created_by: note.created_by.to_hex(),
        created_by_name: users.get(&note.created_by).map(|u| u.name.clone()),
        created_at: to_chrono(note.created_at),
        is_private: note.is_private,
    }
}

/// Populates the given cases in a handful of batch queries.
async fn build_responses(db: &MongoDB, cases: Vec<Case>, viewer: &AuthUser) -> Result<Vec<CaseResponse>, AppError> {
    let user_ids = cases.iter().flat_map(|case| {
        [case.client_id, case.lawyer_id]
            .into_iter()
            .chain(case.notes.iter().map(|note| note.created_by))
    });
    let users = populate::user_summaries(db, user_ids.collect::<Vec<_>>()).await?;
    let documents = populate::documents(db, cases.iter().flat_map(|c| c.documents.clone()).collect::<Vec<_>>()).await?;
    let appointments =
        populate::appointments(db, cases.iter().flat_map(|c| c.appointments.clone()).collect::<Vec<_>>()).await?;

    Ok(cases
        .into_iter()
        .map(|case| CaseResponse {
            id: case.id.map(|id| id.to_hex()).unwrap_or_default(),
            notes: visible_notes(&case, &viewer.id)
                .map(|note| note_response(note, &users))
                .collect(),
            documents: case
                .documents
                .iter()
                .filter_map(|id| documents.get(id))
                .map(DocumentSummary::from)
                .collect(),
            appointments: case
                .appointments
                .iter()
                .filter_map(|id| appointments.get(id))
                .map(AppointmentSummary::from)
                .collect(),
            client_id: case.client_id.to_hex(),
            lawyer_id: case.lawyer_id.to_hex(),
            client: users.get(&case.client_id).cloned(),
            lawyer: users.get(&case.lawyer_id).cloned(),
            title: case.title,
            description: case.description,
            category: case.category,
            status: case.status,
            created_at: to_chrono(case.created_at),
            updated_at: to_chrono(case.updated_at),
        })
        .collect())
}

async fn build_response(db: &MongoDB, case: Case, viewer: &AuthUser) -> Result<CaseResponse, AppError> {
    build_responses(db, vec![case], viewer)
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("Case population returned nothing"))
}

pub async fn find_case(db: &MongoDB, id: &ObjectId) -> Result<Case, AppError> {
    db.cases()
        .find_one(doc! { "_id": id })
        .await?
        .ok_or_else(|| AppError::not_found("Case not found"))
}

// ==================== OPERATIONS ====================

pub async fn list(db: &MongoDB, user: &AuthUser) -> Result<Vec<CaseResponse>, AppError> {
    let cases: Vec<Case> = db
        .cases()
        .find(doc! { "$or": [ { "clientId": user.id }, { "lawyerId": user.id } ] })
        .sort(doc! { "createdAt": -1 })
        .await?
        .try_collect()
        .await?;

    build_responses(db, cases, user).await
}

pub async fn get(db: &MongoDB, id: &str, user: &AuthUser) -> Result<CaseResponse, AppError> {
    let case = find_case(db, &parse_object_id(id)?).await?;
    authorize(user, Action::ViewCase(&case))?;
    build_response(db, case, user).await
}

pub async fn create(
    db: &MongoDB,
    notifier: &Notifier,
    user: &AuthUser,
    request: &CreateCaseRequest,
) -> Result<CaseResponse, AppError> {
    authorize(user, Action::CreateCase)?;
    request.validate()?;

    let client_id = parse_object_id(&request.client_id)?;
    let client = db
        .users()
        .find_one(doc! { "_id": client_id })
        .await?
        .ok_or_else(|| AppError::not_found("Client not found"))?;
    if client.role != Role::Client {
        return Err(AppError::validation("Selected user is not a client"));
    }

    let now = BsonDateTime::now();
    let mut case = Case {
        id: None,
        title: request.title.trim().to_string(),
        description: request.description.clone(),
        category: request.category,
        status: CaseStatus::Open,
        client_id,
        lawyer_id: user.id,
        notes: vec![],
        documents: vec![],
        appointments: vec![],
        created_at: now,
        updated_at: now,
    };

    let result = db.cases().insert_one(&case).await?;
    let case_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::internal("Inserted case has no ObjectId"))?;
    case.id = Some(case_id);

    db.users()
        .update_many(
            doc! { "_id": { "$in": [client_id, user.id] } },
            doc! { "$addToSet": { "cases": case_id } },
        )
        .await?;

    notifier.notify(notification_service::case_created(&case));
    log::info!("📁 Case {} created by {} for client {}", case_id, user.id, client_id);

    build_response(db, case, user).await
}

pub async fn update(
    db: &MongoDB,
    id: &str,
    user: &AuthUser,
    request: &UpdateCaseRequest,
) -> Result<CaseResponse, AppError> {
    request.validate()?;
    let case_id = parse_object_id(id)?;
    let case = find_case(db, &case_id).await?;
    authorize(user, Action::EditCase(&case))?;

    let mut changes = Document::new();
    if let Some(title) = &request.title {
        changes.insert("title", title.trim());
    }
    if let Some(description) = &request.description {
        changes.insert("description", description.as_str());
    }
    if let Some(category) = &request.category {
        changes.insert("category", to_bson(category)?);
    }
    if let Some(status) = &request.status {
        changes.insert("status", to_bson(status)?);
    }
    changes.insert("updatedAt", BsonDateTime::now());

    let updated = db
        .cases()
        .find_one_and_update(doc! { "_id": case_id }, doc! { "$set": changes })
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Case not found"))?;

    build_response(db, updated, user).await
}

/// Appends a note and returns the notes the caller can see.
pub async fn add_note(
    db: &MongoDB,
    notifier: &Notifier,
    id: &str,
    user: &AuthUser,
    request: &AddNoteRequest,
) -> Result<Vec<NoteResponse>, AppError> {
    request.validate()?;
    let case_id = parse_object_id(id)?;
    let case = find_case(db, &case_id).await?;
    authorize(user, Action::AnnotateCase(&case))?;

    let note = CaseNote {
        id: ObjectId::new(),
        content: request.content.clone(),
        created_by: user.id,
        created_at: BsonDateTime::now(),
        is_private: request.is_private,
    };

    let updated = db
        .cases()
        .find_one_and_update(
            doc! { "_id": case_id },
            doc! {
                "$push": { "notes": to_bson(&note)? },
                "$set": { "updatedAt": BsonDateTime::now() },
            },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::not_found("Case not found"))?;

    if !note.is_private {
        if let Some(recipient) = updated.counterpart(&user.id) {
            notifier.notify(notification_service::note_added(&updated, recipient));
        }
    }

    let authors = populate::user_summaries(db, updated.notes.iter().map(|n| n.created_by).collect::<Vec<_>>()).await?;
    Ok(visible_notes(&updated, &user.id)
        .map(|note| note_response(note, &authors))
        .collect())
}

pub async fn delete(db: &MongoDB, id: &str, user: &AuthUser) -> Result<(), AppError> {
    let case_id = parse_object_id(id)?;
    let case = find_case(db, &case_id).await?;
    authorize(user, Action::DeleteCase(&case))?;

    db.users()
        .update_many(
            doc! { "_id": { "$in": [case.client_id, case.lawyer_id] } },
            doc! { "$pull": { "cases": case_id } },
        )
        .await?;
    db.cases().delete_one(doc! { "_id": case_id }).await?;

    log::info!("🗑️  Case {} deleted by {}", case_id, user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseCategory, User};

    fn note(author: ObjectId, is_private: bool) -> CaseNote {
        CaseNote {
            id: ObjectId::new(),
            content: "Call the witness".into(),
            created_by: author,
            created_at: BsonDateTime::now(),
            is_private,
        }
    }

    #[test]
    fn private_notes_only_visible_to_author() {
        let lawyer = ObjectId::new();
        let client = ObjectId::new();
        let case = Case {
            id: Some(ObjectId::new()),
            title: "Estate".into(),
            description: "Probate".into(),
            category: None,
            status: CaseStatus::Open,
            client_id: client,
            lawyer_id: lawyer,
            notes: vec![note(lawyer, true), note(client, false), note(lawyer, false)],
            documents: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
            updated_at: BsonDateTime::now(),
        };

        assert_eq!(visible_notes(&case, &lawyer).count(), 3);
        assert_eq!(visible_notes(&case, &client).count(), 2);
    }

    async fn insert_user(db: &MongoDB, role: Role) -> AuthUser {
        let mut user = User {
            id: None,
            name: format!("{} user", role),
            email: format!("{}@example.com", ObjectId::new().to_hex()),
            password: "not-a-real-hash".into(),
            role,
            phone: None,
            is_active: true,
            password_reset_token: None,
            password_reset_expires: None,
            cases: vec![],
            appointments: vec![],
            created_at: BsonDateTime::now(),
        };
        user.id = db.users().insert_one(&user).await.unwrap().inserted_id.as_object_id();
        AuthUser::from_user(&user).unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn case_lifecycle_maintains_both_parties() {
        let db = crate::database::test_database().await;
        let (notifier, mut events) = Notifier::channel();
        let lawyer = insert_user(&db, Role::Lawyer).await;
        let client = insert_user(&db, Role::Client).await;

        let request = CreateCaseRequest {
            title: "Wrongful dismissal".into(),
            description: "Terminated without notice".into(),
            category: Some(CaseCategory::Employment),
            client_id: client.id.to_hex(),
        };
        assert!(create(&db, &notifier, &client, &request).await.is_err());

        let created = create(&db, &notifier, &lawyer, &request).await.unwrap();
        let case_id = parse_object_id(&created.id).unwrap();
        assert!(events.try_recv().is_ok());

        for party in [&lawyer, &client] {
            let stored = db.users().find_one(doc! { "_id": party.id }).await.unwrap().unwrap();
            assert!(stored.cases.contains(&case_id));
        }

        let notes = add_note(
            &db,
            &notifier,
            &created.id,
            &client,
            &AddNoteRequest { content: "Uploaded my contract".into(), is_private: false },
        )
        .await
        .unwrap();
        assert_eq!(notes.len(), 1);

        assert!(delete(&db, &created.id, &client).await.is_err());
        delete(&db, &created.id, &lawyer).await.unwrap();

        for party in [&lawyer, &client] {
            let stored = db.users().find_one(doc! { "_id": party.id }).await.unwrap().unwrap();
            assert!(!stored.cases.contains(&case_id));
        }
        assert!(matches!(delete(&db, &created.id, &lawyer).await, Err(AppError::NotFound(_))));
    }
}
