use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};

use crate::entity::user;
use crate::extractors::auth::AuthUser;

/// Mirror the caller into the local `user` table.
///
/// Identity lives in the external provider; the local row only exists so
/// admin list views can join usernames. Upserted on every mutating call, so
/// a renamed account converges on its next write.
pub async fn sync_user<C: ConnectionTrait>(db: &C, auth: &AuthUser) -> Result<(), DbErr> {
    let model = user::ActiveModel {
        id: Set(auth.user_id),
        username: Set(auth.username.clone()),
        created_at: Set(chrono::Utc::now()),
    };

    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_column(user::Column::Username)
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}
