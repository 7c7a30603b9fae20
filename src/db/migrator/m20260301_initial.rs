use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Shared secret for the seeded admin (base32, 16 bytes decoded).
/// Enroll it in any authenticator app to exercise the second factor.
const ADMIN_TOTP_SECRET: &str = "LXBSMDTMSP2I5XFXIYRGFVWSFI";

/// Password for every seeded account.
const SEED_PASSWORD: &[u8] = b"pwd";

fn hash_seed_password() -> String {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(SEED_PASSWORD, &salt)
        .expect("Failed to hash seed password")
        .to_string()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Users)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Posts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Comments)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(InterestingFlags)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        let now = chrono::Utc::now().to_rfc3339();

        // Seed accounts: one admin with a second factor, two regular users.
        // IDs are sequential from 1 in insertion order.
        let seed_users: [(&str, Option<&str>, bool); 3] = [
            ("alberto", Some(ADMIN_TOTP_SECRET), true),
            ("carl", None, false),
            ("diana", None, false),
        ];

        for (username, totp_secret, is_admin) in seed_users {
            let insert = Query::insert()
                .into_table(Users)
                .columns([
                    crate::entities::users::Column::Username,
                    crate::entities::users::Column::PasswordHash,
                    crate::entities::users::Column::TotpSecret,
                    crate::entities::users::Column::IsAdmin,
                    crate::entities::users::Column::CreatedAt,
                ])
                .values_panic([
                    username.into(),
                    hash_seed_password().into(),
                    totp_secret.into(),
                    is_admin.into(),
                    now.clone().into(),
                ])
                .to_owned();

            manager.exec_stmt(insert).await?;
        }

        let welcome_post = Query::insert()
            .into_table(Posts)
            .columns([
                crate::entities::posts::Column::Title,
                crate::entities::posts::Column::Text,
                crate::entities::posts::Column::MaxComments,
                crate::entities::posts::Column::UserId,
                crate::entities::posts::Column::CreatedAt,
            ])
            .values_panic([
                "Welcome to agora".into(),
                "Introduce yourself below. Anonymous comments are allowed.".into(),
                Option::<i32>::None.into(),
                1.into(),
                now.clone().into(),
            ])
            .to_owned();

        manager.exec_stmt(welcome_post).await?;

        let welcome_comment = Query::insert()
            .into_table(Comments)
            .columns([
                crate::entities::comments::Column::Text,
                crate::entities::comments::Column::UserId,
                crate::entities::comments::Column::PostId,
                crate::entities::comments::Column::CreatedAt,
            ])
            .values_panic([
                "First!".into(),
                Option::<i32>::None.into(),
                1.into(),
                now.into(),
            ])
            .to_owned();

        manager.exec_stmt(welcome_comment).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InterestingFlags).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Posts).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).to_owned())
            .await?;

        Ok(())
    }
}
