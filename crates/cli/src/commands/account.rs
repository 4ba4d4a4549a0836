//! Account commands.

use clap::Args;
use secrecy::SecretString;

use easybuy_core::UserType;
use easybuy_storefront::error::AppError;
use easybuy_storefront::models::{LoginCredentials, RegistrationData, User};
use easybuy_storefront::navigation::{Location, View};
use easybuy_storefront::session::SessionError;
use easybuy_storefront::state::AppState;

use super::enter;

/// Sign-up form.
#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    email: String,

    #[arg(long)]
    phone: String,

    #[arg(short, long)]
    password: String,

    /// Defaults to the password
    #[arg(long)]
    password_confirmation: Option<String>,

    /// Defaults to the email local part
    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    first_name: Option<String>,

    #[arg(long)]
    last_name: Option<String>,

    /// Defaults to the phone number
    #[arg(long)]
    whatsapp: Option<String>,

    #[arg(long)]
    address: Option<String>,

    #[arg(long)]
    city: Option<String>,

    /// Register as a reseller instead of a client
    #[arg(long)]
    reseller: bool,
}

#[allow(clippy::print_stdout)]
fn print_user(user: &User) {
    println!("{} <{}>", user.display_name(), user.email);
    if !user.phone.is_empty() {
        println!("  phone:    {}", user.phone);
    }
    if let Some(whatsapp) = user.whatsapp.as_deref().filter(|w| !w.is_empty()) {
        println!("  whatsapp: {whatsapp}");
    }
    if !user.city.is_empty() {
        println!("  city:     {}", user.city);
    }
    println!("  account:  {}", user.user_type);
}

/// Sign in, then follow the guard back to where the visitor was headed.
pub async fn login(state: &AppState, email: String, password: String) -> Result<(), AppError> {
    enter(state, &View::Login)?;
    state
        .session()
        .login(&LoginCredentials::new(email, password))
        .await?;
    state.guard().apply(state.navigator());
    Ok(())
}

pub async fn register(state: &AppState, args: RegisterArgs) -> Result<(), AppError> {
    enter(state, &View::Register)?;

    let confirmation = args
        .password_confirmation
        .unwrap_or_else(|| args.password.clone());
    let data = RegistrationData {
        username: args.username,
        email: args.email,
        phone: args.phone,
        whatsapp: args.whatsapp,
        first_name: args.first_name,
        last_name: args.last_name,
        address: args.address,
        city: args.city,
        password: SecretString::from(args.password),
        password_confirmation: SecretString::from(confirmation),
        user_type: Some(if args.reseller {
            UserType::Reseller
        } else {
            UserType::Client
        }),
    };

    state.session().register(&data).await?;
    state.navigator().navigate(Location::from(View::Home));
    Ok(())
}

pub async fn logout(state: &AppState) {
    state.session().logout().await;
}

/// Refresh and print the signed-in user.
pub async fn whoami(state: &AppState) -> Result<(), AppError> {
    enter(state, &View::Profile)?;
    let user = match state.session().refresh_user().await {
        Some(user) => user,
        None => state
            .session()
            .user()
            .ok_or(SessionError::NotAuthenticated)?,
    };
    print_user(&user);
    Ok(())
}
